use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};

use crate::api::{BrainApi, ContentPayload};
use crate::app::App;
use crate::auth::TokenStore;
use crate::content::{Job, JobOutcome, SubmissionRunner, CONTENT_ADDED};

#[derive(Args, Debug, Clone)]
pub struct AddContentArgs {
    /// Title of the saved content
    #[arg(long)]
    pub title: String,
    /// URL the content points at
    #[arg(long)]
    pub link: String,
    /// Free-form tags, e.g. "#vibe,#grind"
    #[arg(long, default_value = "")]
    pub tags: String,
    /// Brain (collection) to file the content under
    #[arg(long, default_value = "")]
    pub brain: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Cover image, uploaded before the content is saved
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UploadImageArgs {
    /// Image file to upload
    pub path: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TokenCommand {
    /// Store the session token used for authenticated requests
    Set {
        token: String,
    },
    /// Forget the stored session token
    Clear,
    /// Print a masked copy of the stored token
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn add_content(api: Arc<dyn BrainApi>, args: AddContentArgs) -> Result<()> {
    if let Some(image) = &args.image {
        if !image.is_file() {
            bail!("image {} is not a readable file", image.display());
        }
    }
    let job = Job::AddContent {
        payload: ContentPayload {
            title: args.title,
            link: args.link,
            tags: args.tags,
            brain: args.brain,
            description: args.description,
            image: None,
        },
        image: args.image,
    };
    let line = describe_outcome(run_job(api, job)?)?;
    println!("{line}");
    Ok(())
}

pub fn upload_image(api: Arc<dyn BrainApi>, args: UploadImageArgs) -> Result<()> {
    if !args.path.is_file() {
        bail!("{} is not a readable file", args.path.display());
    }
    let line = describe_outcome(run_job(api, Job::UploadImage { path: args.path })?)?;
    println!("{line}");
    Ok(())
}

pub fn handle_token_command(store: &TokenStore, args: TokenArgs) -> Result<()> {
    match args.command {
        TokenCommand::Set { token } => {
            let token = token.trim();
            if token.is_empty() {
                bail!("token cannot be empty");
            }
            store.set_token(token).context("saving session token")?;
            println!("Token saved to {}", store.path().display());
        }
        TokenCommand::Clear => {
            if store.clear_token().context("clearing session token")? {
                println!("Token cleared");
            } else {
                println!("No token stored");
            }
        }
        TokenCommand::Show => match store.token()? {
            Some(token) => println!("{}", mask_token(&token)),
            None => println!("No token stored"),
        },
    }
    Ok(())
}

/// Runs the job on the same worker the TUI uses and blocks for the answer.
fn run_job(api: Arc<dyn BrainApi>, job: Job) -> Result<JobOutcome> {
    let mut runner = SubmissionRunner::new(api);
    runner.start(job);
    runner
        .wait()
        .ok_or_else(|| anyhow!("request worker did not start"))
}

fn describe_outcome(outcome: JobOutcome) -> Result<String> {
    match outcome {
        JobOutcome::ContentCreated => Ok(CONTENT_ADDED.to_string()),
        JobOutcome::ContentUnconfirmed { status } => {
            Ok(format!("Server answered {status}; content may not have been saved"))
        }
        JobOutcome::ImageUploaded { link } => Ok(link),
        JobOutcome::ContentFailed { message } | JobOutcome::ImageFailed { message } => {
            Err(anyhow!(message))
        }
    }
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "*".repeat(token.chars().count())
    } else {
        format!("{visible}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::submit::tests::FakeApi;
    use crate::content::CONTENT_FAILED;
    use std::fs::File;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    #[test]
    fn cli_add_content_reports_success() -> TestResult {
        let api = Arc::new(FakeApi::default());
        let outcome = run_job(
            api.clone(),
            Job::AddContent {
                payload: ContentPayload {
                    title: "Rust".into(),
                    link: "https://rust-lang.org".into(),
                    ..ContentPayload::default()
                },
                image: None,
            },
        )?;
        assert_eq!(describe_outcome(outcome)?, CONTENT_ADDED);
        assert_eq!(api.sent.lock().expect("lock")[0].title, "Rust");
        Ok(())
    }

    #[test]
    fn cli_add_content_failure_is_an_error() -> TestResult {
        let api = Arc::new(FakeApi {
            add_error: Some((500, String::new())),
            ..FakeApi::default()
        });
        let outcome = run_job(
            api,
            Job::AddContent {
                payload: ContentPayload::default(),
                image: None,
            },
        )?;
        let err = describe_outcome(outcome).expect_err("failure");
        assert_eq!(err.to_string(), CONTENT_FAILED);
        Ok(())
    }

    #[test]
    fn cli_upload_image_prints_link() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.path().join("cover.png");
        File::create(&path)?;
        let api = Arc::new(FakeApi {
            upload_link: Some("https://cdn.example/cover.png".into()),
            ..FakeApi::default()
        });
        let outcome = run_job(api, Job::UploadImage { path })?;
        assert_eq!(describe_outcome(outcome)?, "https://cdn.example/cover.png");
        Ok(())
    }

    #[test]
    fn cli_upload_rejects_missing_file() {
        let api: Arc<dyn BrainApi> = Arc::new(FakeApi::default());
        let result = upload_image(
            api,
            UploadImageArgs {
                path: PathBuf::from("/definitely/not/here.png"),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn cli_token_set_show_clear() -> TestResult {
        let dir = TempDir::new()?;
        let store = TokenStore::new(dir.path().join("storage.json"));
        handle_token_command(
            &store,
            TokenArgs {
                command: TokenCommand::Set {
                    token: "  secret-token ".into(),
                },
            },
        )?;
        assert_eq!(store.token()?.as_deref(), Some("secret-token"));

        handle_token_command(
            &store,
            TokenArgs {
                command: TokenCommand::Clear,
            },
        )?;
        assert_eq!(store.token()?, None);

        let blank = handle_token_command(
            &store,
            TokenArgs {
                command: TokenCommand::Set { token: "  ".into() },
            },
        );
        assert!(blank.is_err());
        Ok(())
    }

    #[test]
    fn masked_token_hides_the_tail() {
        assert_eq!(mask_token("abcdefgh"), "abcd…");
        assert_eq!(mask_token("abc"), "***");
    }
}
