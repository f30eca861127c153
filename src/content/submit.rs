use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};

use crate::api::{ApiError, BrainApi, ContentPayload};

use super::{CONTENT_FAILED, IMAGE_UPLOAD_FAILED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Upload `image` first when present, then post the payload with the
    /// returned link.
    AddContent {
        payload: ContentPayload,
        image: Option<PathBuf>,
    },
    UploadImage {
        path: PathBuf,
    },
}

impl Job {
    /// Generic failure for a job whose worker never reported.
    fn fallback_failure(&self) -> JobOutcome {
        match self {
            Job::AddContent { .. } => JobOutcome::ContentFailed {
                message: CONTENT_FAILED.to_string(),
            },
            Job::UploadImage { .. } => JobOutcome::ImageFailed {
                message: IMAGE_UPLOAD_FAILED.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    ContentCreated,
    /// The backend accepted the request with a 2xx other than 201.
    ContentUnconfirmed {
        status: u16,
    },
    ContentFailed {
        message: String,
    },
    ImageUploaded {
        link: String,
    },
    ImageFailed {
        message: String,
    },
}

/// Runs a job to completion against `api`. Never panics on backend errors;
/// every failure becomes a `*Failed` outcome carrying a user-facing message.
pub fn execute(api: &dyn BrainApi, job: Job) -> JobOutcome {
    match job {
        Job::AddContent { mut payload, image } => {
            if let Some(path) = image {
                match api.upload_image(&path) {
                    Ok(link) => payload.image = Some(link),
                    Err(err) => {
                        tracing::error!(%err, file = %path.display(), "image upload failed");
                        return JobOutcome::ContentFailed {
                            message: IMAGE_UPLOAD_FAILED.to_string(),
                        };
                    }
                }
            }
            match api.add_content(&payload) {
                Ok(201) => JobOutcome::ContentCreated,
                Ok(status) => JobOutcome::ContentUnconfirmed { status },
                Err(err) => {
                    tracing::error!(%err, "add content failed");
                    JobOutcome::ContentFailed {
                        message: content_failure_message(&err),
                    }
                }
            }
        }
        Job::UploadImage { path } => match api.upload_image(&path) {
            Ok(link) => JobOutcome::ImageUploaded { link },
            Err(err) => {
                tracing::error!(%err, file = %path.display(), "image upload failed");
                JobOutcome::ImageFailed {
                    message: IMAGE_UPLOAD_FAILED.to_string(),
                }
            }
        },
    }
}

fn content_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::MissingToken => err.to_string(),
        _ => err
            .server_message()
            .map(str::to_owned)
            .unwrap_or_else(|| CONTENT_FAILED.to_string()),
    }
}

struct InFlight {
    job: Job,
    receiver: Receiver<JobOutcome>,
}

/// Runs one job at a time on a worker thread and hands the outcome back to
/// the UI loop through [`SubmissionRunner::poll`].
pub struct SubmissionRunner {
    api: Arc<dyn BrainApi>,
    in_flight: Option<InFlight>,
}

impl SubmissionRunner {
    pub fn new(api: Arc<dyn BrainApi>) -> Self {
        Self {
            api,
            in_flight: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns `false` without starting anything while another job runs.
    pub fn start(&mut self, job: Job) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        let (sender, receiver) = bounded(1);
        let api = Arc::clone(&self.api);
        let worker_job = job.clone();
        let spawned = thread::Builder::new()
            .name("brain-submit".into())
            .spawn(move || {
                let outcome = execute(api.as_ref(), worker_job);
                let _ = sender.send(outcome);
            });
        match spawned {
            Ok(_) => {
                self.in_flight = Some(InFlight { job, receiver });
            }
            Err(err) => {
                tracing::error!(%err, "failed to spawn submission worker");
                // Report through the same channel so the caller still sees an
                // outcome on the next poll.
                let (sender, receiver) = bounded(1);
                let _ = sender.send(job.fallback_failure());
                self.in_flight = Some(InFlight { job, receiver });
            }
        }
        true
    }

    /// Non-blocking. A worker that died without reporting yields a failure.
    pub fn poll(&mut self) -> Option<JobOutcome> {
        let in_flight = self.in_flight.as_ref()?;
        let outcome = match in_flight.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("submission worker exited without a result");
                in_flight.job.fallback_failure()
            }
        };
        self.in_flight = None;
        Some(outcome)
    }

    /// Blocks until the running job reports. Used by the command line.
    pub fn wait(&mut self) -> Option<JobOutcome> {
        let in_flight = self.in_flight.take()?;
        let outcome = in_flight
            .receiver
            .recv()
            .unwrap_or_else(|_| in_flight.job.fallback_failure());
        Some(outcome)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Scripted backend that records what it was asked to do.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub add_status: Option<u16>,
        pub add_error: Option<(u16, String)>,
        pub upload_link: Option<String>,
        pub panic_on_add: bool,
        pub panic_on_upload: bool,
        pub sent: Mutex<Vec<ContentPayload>>,
        pub uploads: Mutex<Vec<PathBuf>>,
    }

    impl BrainApi for FakeApi {
        fn add_content(&self, payload: &ContentPayload) -> Result<u16, ApiError> {
            if self.panic_on_add {
                panic!("backend exploded");
            }
            self.sent.lock().expect("lock").push(payload.clone());
            if let Some((status, message)) = &self.add_error {
                return Err(ApiError::Status {
                    status: *status,
                    message: message.clone(),
                });
            }
            Ok(self.add_status.unwrap_or(201))
        }

        fn upload_image(&self, path: &Path) -> Result<String, ApiError> {
            if self.panic_on_upload {
                panic!("upload exploded");
            }
            self.uploads.lock().expect("lock").push(path.to_path_buf());
            self.upload_link.clone().ok_or(ApiError::MissingLink)
        }
    }

    fn add_job(image: Option<&str>) -> Job {
        Job::AddContent {
            payload: ContentPayload {
                title: "Vibe".into(),
                ..ContentPayload::default()
            },
            image: image.map(PathBuf::from),
        }
    }

    fn poll_until_done(runner: &mut SubmissionRunner) -> JobOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = runner.poll() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "worker never reported");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn created_status_is_success() {
        let api = FakeApi::default();
        assert_eq!(execute(&api, add_job(None)), JobOutcome::ContentCreated);
        let sent = api.sent.lock().expect("lock");
        assert_eq!(sent[0].image, None);
    }

    #[test]
    fn other_success_status_is_unconfirmed() {
        let api = FakeApi {
            add_status: Some(200),
            ..FakeApi::default()
        };
        assert_eq!(
            execute(&api, add_job(None)),
            JobOutcome::ContentUnconfirmed { status: 200 }
        );
    }

    #[test]
    fn image_is_uploaded_first_and_link_is_sent() {
        let api = FakeApi {
            upload_link: Some("https://cdn.example/cover.png".into()),
            ..FakeApi::default()
        };
        assert_eq!(execute(&api, add_job(Some("/tmp/cover.png"))), JobOutcome::ContentCreated);
        let sent = api.sent.lock().expect("lock");
        assert_eq!(sent[0].image.as_deref(), Some("https://cdn.example/cover.png"));
        assert_eq!(api.uploads.lock().expect("lock").len(), 1);
    }

    #[test]
    fn failed_upload_abandons_the_submission() {
        let api = FakeApi::default();
        let outcome = execute(&api, add_job(Some("/tmp/cover.png")));
        assert_eq!(
            outcome,
            JobOutcome::ContentFailed {
                message: IMAGE_UPLOAD_FAILED.into()
            }
        );
        assert!(api.sent.lock().expect("lock").is_empty());
    }

    #[test]
    fn server_message_is_preferred_over_generic_text() {
        let api = FakeApi {
            add_error: Some((400, "Link is required".into())),
            ..FakeApi::default()
        };
        assert_matches!(
            execute(&api, add_job(None)),
            JobOutcome::ContentFailed { message } if message == "Link is required"
        );

        let silent = FakeApi {
            add_error: Some((500, String::new())),
            ..FakeApi::default()
        };
        assert_matches!(
            execute(&silent, add_job(None)),
            JobOutcome::ContentFailed { message } if message == CONTENT_FAILED
        );
    }

    #[test]
    fn runner_refuses_second_job_while_busy() {
        let mut runner = SubmissionRunner::new(Arc::new(FakeApi::default()));
        assert!(runner.start(add_job(None)));
        assert!(runner.is_busy());
        assert!(!runner.start(add_job(None)));
        assert_eq!(poll_until_done(&mut runner), JobOutcome::ContentCreated);
        assert!(!runner.is_busy());
    }

    #[test]
    fn panicking_worker_still_clears_busy_state() {
        let mut runner = SubmissionRunner::new(Arc::new(FakeApi {
            panic_on_add: true,
            ..FakeApi::default()
        }));
        runner.start(add_job(None));
        assert_eq!(
            poll_until_done(&mut runner),
            JobOutcome::ContentFailed {
                message: CONTENT_FAILED.into()
            }
        );
        assert!(!runner.is_busy());
    }

    #[test]
    fn upload_job_reports_link() {
        let mut runner = SubmissionRunner::new(Arc::new(FakeApi {
            upload_link: Some("https://cdn.example/a.png".into()),
            ..FakeApi::default()
        }));
        runner.start(Job::UploadImage {
            path: PathBuf::from("/tmp/a.png"),
        });
        assert_eq!(
            runner.wait(),
            Some(JobOutcome::ImageUploaded {
                link: "https://cdn.example/a.png".into()
            })
        );
    }

    #[test]
    fn panicking_upload_worker_reports_upload_failure() {
        let api = Arc::new(FakeApi {
            panic_on_upload: true,
            ..FakeApi::default()
        });
        let image_failed = JobOutcome::ImageFailed {
            message: IMAGE_UPLOAD_FAILED.into(),
        };

        let mut runner = SubmissionRunner::new(api.clone());
        runner.start(Job::UploadImage {
            path: PathBuf::from("/tmp/a.png"),
        });
        assert_eq!(runner.wait(), Some(image_failed.clone()));

        let mut runner = SubmissionRunner::new(api);
        runner.start(Job::UploadImage {
            path: PathBuf::from("/tmp/a.png"),
        });
        assert_eq!(poll_until_done(&mut runner), image_failed);
    }

    #[test]
    fn fallback_failure_matches_the_job_kind() {
        assert_eq!(
            add_job(None).fallback_failure(),
            JobOutcome::ContentFailed {
                message: CONTENT_FAILED.into()
            }
        );
        let upload = Job::UploadImage {
            path: PathBuf::from("/tmp/a.png"),
        };
        assert_eq!(
            upload.fallback_failure(),
            JobOutcome::ImageFailed {
                message: IMAGE_UPLOAD_FAILED.into()
            }
        );
    }
}
