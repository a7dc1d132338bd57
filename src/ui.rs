//! Saída de terminal do verdict: spinner e status coloridos.
//!
//! Usa `indicatif` para o spinner enquanto a fila é drenada e `console`
//! para estilizar os relatórios de status.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use verdict::intake::{Status, StatusReport, Submission};
use verdict::store::StateCounts;

/// Spinner exibido enquanto os workers drenam a fila.
pub struct DrainProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl DrainProgress {
    pub fn start(queued: usize, workers: usize) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Evaluating {queued} queued job(s) with {workers} worker(s)"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Finaliza o spinner e resume quantos jobs terminaram em cada estado.
    pub fn finish(&self, processed: usize, counts: &StateCounts) {
        self.pb.finish_and_clear();
        println!(
            "  {} {processed} job(s) processed: {} completed, {} failed",
            self.green.apply_to("✓"),
            self.green.apply_to(counts.completed),
            self.red.apply_to(counts.failed),
        );
    }
}

pub fn print_submission(submission: &Submission) {
    println!("{}", submission.job_id);
}

/// Imprime o relatório de status em JSON, com um cabeçalho colorido pelo estado.
pub fn print_status(job_id: &str, report: &StatusReport) {
    let style = match report.status {
        Status::Completed => Style::new().green().bold(),
        Status::Failed | Status::NotFound => Style::new().red().bold(),
        Status::Queued | Status::Active => Style::new().yellow(),
    };
    println!("{}", style.apply_to(format!("─── {job_id} ───")));
    println!(
        "{}",
        serde_json::to_string_pretty(report).unwrap_or_default()
    );
}
