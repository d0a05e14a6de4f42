use std::path::PathBuf;

use reframe_model::AnalysisMethod;
use reframe_pipeline::{parse_aspect, ReframeRequest};
use tokio::sync::watch;

pub mod analyze;
pub mod check;
pub mod info;
pub mod run;

/// Arguments shared by `run` and `analyze`.
pub struct JobArgs {
    pub input: PathBuf,
    pub aspect: String,
    pub method: String,
    pub max_segment: Option<f64>,
}

impl JobArgs {
    pub fn into_request(self) -> anyhow::Result<ReframeRequest> {
        let aspect = parse_aspect(&self.aspect)?;
        let method: AnalysisMethod = self.method.parse()?;
        let mut request = ReframeRequest::new(self.input, aspect).with_method(method);
        if let Some(secs) = self.max_segment {
            request = request.with_max_segment_duration(secs);
        }
        Ok(request)
    }
}

/// Cancellation flag flipped on Ctrl-C.
pub fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            let _ = tx.send(true);
        }
    });
    rx
}
