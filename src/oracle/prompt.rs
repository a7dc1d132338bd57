//! Grading prompt shared by every judge provider.

use std::fmt::Write as _;

use crate::request::EvaluationRequest;

pub(crate) const GRADER_CONTEXT: &str = "You are an experienced educator and grader. Evaluate a student's answer \
to an exam question against the provided rubrics. Assess correctness, completeness and adherence to \
the rubrics, and give constructive, objective feedback.\n\
- \"status\" is \"correct\" if the answer fully meets the rubrics, \"incorrect\" if it does not, \
\"incomplete\" if it partially does.\n\
- \"feedback\" names what was right or wrong about the answer.\n\
- \"hint\" is optional guidance on what to study or improve.";

pub(crate) fn build_prompt(request: &EvaluationRequest) -> String {
    let rubrics = if request.rubrics.is_empty() {
        "N/A".to_string()
    } else {
        request.rubrics.iter().fold(String::new(), |mut out, r| {
            let _ = writeln!(out, "ID: {}, Title: {}, Points: {}", r.id, r.title, r.points);
            out
        })
    };

    format!(
        "Please evaluate the following student answer based on the provided rubrics and model \
         solution (if they are provided).\n\n\
         Question:\n{question}\n\n\
         Answer:\n{answer}\n\n\
         Max Points:\n{max}\n\n\
         Min Points:\n{min}\n\n\
         Point Step:\n{step}\n\n\
         Rubrics:\n{rubrics}\n\n\
         Model Solution:\n{solution}\n\n\
         Respond with ONLY valid JSON in this format, no other text:\n\
         {{\"status\": \"correct|incorrect|incomplete\", \"feedback\": \"...\", \"hint\": \"...\", \
         \"passedRubrics\": [\"id\"], \"failedRubrics\": [\"id\"], \"points\": 1}}",
        question = request.question,
        answer = request.answer,
        max = request.max_points,
        min = request.min_points,
        step = request.point_step,
        rubrics = rubrics.trim_end(),
        solution = request.model_solution.as_deref().unwrap_or("N/A"),
    )
}
