use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::blocking::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    PoseClassifier,
    Labels,
}

impl ModelKind {
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::PoseClassifier => "pose classifier model",
            ModelKind::Labels => "pose label list",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelDownloadEvent {
    AlreadyPresent { model: ModelKind },
    Downloaded { model: ModelKind, bytes: u64 },
}

/// Makes sure `path` exists, fetching it from `url` when missing.
///
/// Without a URL a missing file is an error; an existing file is never touched.
pub fn ensure_file_ready<F>(
    model: ModelKind,
    path: &Path,
    url: Option<&str>,
    mut on_event: F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model });
        return Ok(());
    }

    let Some(url) = url else {
        bail!(
            "{} not found at {} and no download URL configured",
            model.label(),
            path.display()
        );
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let bytes = fetch(model, url, path)?;
    on_event(ModelDownloadEvent::Downloaded { model, bytes });
    Ok(())
}

pub fn ensure_model_ready<F>(path: &Path, url: Option<&str>, on_event: F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    ensure_file_ready(ModelKind::PoseClassifier, path, url, on_event)
}

pub fn ensure_labels_ready<F>(path: &Path, url: Option<&str>, on_event: F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    ensure_file_ready(ModelKind::Labels, path, url, on_event)
}

/// Streams `url` into a `.part` sibling of `dest`, then renames it into place.
fn fetch(model: ModelKind, url: &str, dest: &Path) -> anyhow::Result<u64> {
    log::info!(
        "downloading {} from {url} to {}",
        model.label(),
        dest.display()
    );

    let response = Client::new()
        .get(url)
        .send()
        .with_context(|| format!("failed to request {}", model.label()))?
        .error_for_status()
        .with_context(|| format!("server refused {}", model.label()))?;

    let partial = partial_path(dest);
    let mut file = fs::File::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;

    let pb = progress_bar(model, response.content_length(), ProgressDrawTarget::stderr());
    let bytes = io::copy(&mut pb.wrap_read(response), &mut file)
        .with_context(|| format!("failed while downloading {}", model.label()))?;
    file.sync_all()
        .context("failed to flush download to disk")?;
    pb.finish_with_message("done");

    fs::rename(&partial, dest).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            partial.display(),
            dest.display()
        )
    })?;
    Ok(bytes)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn progress_bar(model: ModelKind, total: Option<u64>, target: ProgressDrawTarget) -> ProgressBar {
    let total = total.filter(|&t| t > 0);
    let pb = ProgressBar::with_draw_target(total, target);
    if total.is_some() {
        pb.set_style(
            ProgressStyle::with_template("{prefix:>22} [{bar:30}] {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
    } else {
        pb.set_style(
            ProgressStyle::with_template("{prefix:>22} {spinner} {bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
    }
    pb.set_prefix(model.label());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "chair\ncobra\n").unwrap();

        let mut events = Vec::new();
        ensure_labels_ready(&path, Some("http://127.0.0.1:9/unused"), |evt| events.push(evt))
            .unwrap();

        assert_eq!(
            events,
            vec![ModelDownloadEvent::AlreadyPresent {
                model: ModelKind::Labels
            }]
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "chair\ncobra\n");
    }

    #[test]
    fn missing_file_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose_classifier.onnx");

        let err = ensure_model_ready(&path, None, |_| {}).unwrap_err();
        assert!(err.to_string().contains("pose classifier model"));
        assert!(err.to_string().contains("no download URL"));
        assert!(!path.exists());
    }

    #[test]
    fn progress_bar_names_what_is_downloading() {
        let labels = progress_bar(ModelKind::Labels, Some(128), ProgressDrawTarget::hidden());
        assert_eq!(labels.prefix(), "pose label list");
        assert_eq!(labels.length(), Some(128));

        let model = progress_bar(
            ModelKind::PoseClassifier,
            Some(0),
            ProgressDrawTarget::hidden(),
        );
        assert_eq!(model.prefix(), "pose classifier model");
        assert_eq!(model.length(), None);
    }

    #[test]
    fn partial_download_sits_next_to_destination() {
        let dest = Path::new("models/pose_labels.txt");
        assert_eq!(
            partial_path(dest),
            PathBuf::from("models/pose_labels.txt.part")
        );
    }
}
