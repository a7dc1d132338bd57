//! Interface de linha de comando do verdict baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (submit, status,
//! work, purge) e flags globais que sobrepõem o `verdict.toml`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// verdict: avaliação de respostas em fila, com juízes LLM e votação por maioria.
#[derive(Debug, Parser)]
#[command(name = "verdict", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Número de workers concorrentes.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Novas tentativas por chamada ao juiz após a primeira (0 = sem retry).
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Banco SQLite onde os jobs são persistidos.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enfileira uma ou mais requisições lidas de um arquivo JSON.
    Submit {
        /// Arquivo com um objeto de requisição ou uma lista deles.
        file: PathBuf,
    },

    /// Mostra o status de um job.
    Status {
        job_id: String,
    },

    /// Processa os jobs enfileirados com o pool de workers.
    Work {
        /// Continua aguardando novos jobs até Ctrl-C em vez de sair quando a fila esvazia.
        #[arg(long, default_value_t = false)]
        follow: bool,
    },

    /// Remove jobs finalizados mais antigos que o período de retenção.
    Purge {
        /// Sobrepõe `retention_secs` do arquivo de configuração.
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_submit_subcommand() {
        let cli = Cli::parse_from(["verdict", "submit", "requests.json"]);
        match cli.command {
            Command::Submit { file } => assert_eq!(file, PathBuf::from("requests.json")),
            _ => panic!("expected Submit command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "verdict",
            "--workers",
            "8",
            "--max-retries",
            "5",
            "--store",
            "/tmp/verdict.db",
            "--verbose",
            "work",
            "--follow",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.workers, Some(8));
        assert_eq!(cli.max_retries, Some(5));
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/verdict.db")));
        assert!(matches!(cli.command, Command::Work { follow: true }));
    }

    #[test]
    fn cli_rejects_old_attempts_flag() {
        assert!(Cli::try_parse_from(["verdict", "--attempts", "3", "work"]).is_err());
        let cli = Cli::parse_from(["verdict", "work", "--max-retries", "0"]);
        assert_eq!(cli.max_retries, Some(0));
    }

    #[test]
    fn cli_parses_purge_override() {
        let cli = Cli::parse_from(["verdict", "purge", "--older-than-secs", "60"]);
        assert!(matches!(
            cli.command,
            Command::Purge {
                older_than_secs: Some(60)
            }
        ));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
