use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

const FACE_MODEL_FILENAME: &str = "version-RFB-320.onnx";
const FACE_MODEL_URL: &str = "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/ultraface/models/version-RFB-320.onnx";

pub fn default_face_model_path() -> PathBuf {
    PathBuf::from("models").join(FACE_MODEL_FILENAME)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadEvent {
    AlreadyPresent,
    Started { total: Option<u64> },
    Progress { downloaded: u64, total: Option<u64> },
    Finished,
}

/// Downloads the face model if missing, reporting progress on the console.
pub fn ensure_face_model_available(model_path: &Path) -> anyhow::Result<()> {
    let mut progress: Option<ProgressBar> = None;
    ensure_face_model_ready(model_path, |event| match event {
        DownloadEvent::Started { total } => {
            progress = Some(create_progress_bar(total));
        }
        DownloadEvent::Progress { downloaded, .. } => {
            if let Some(pb) = progress.as_ref() {
                pb.set_position(downloaded);
            }
        }
        DownloadEvent::Finished => {
            if let Some(pb) = progress.take() {
                pb.finish_with_message("face model ready");
            }
        }
        DownloadEvent::AlreadyPresent => {}
    })
}

pub fn ensure_face_model_ready<F>(model_path: &Path, mut on_event: F) -> anyhow::Result<()>
where
    F: FnMut(DownloadEvent),
{
    if model_path.exists() {
        on_event(DownloadEvent::AlreadyPresent);
        on_event(DownloadEvent::Finished);
        return Ok(());
    }

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    download_to_path(FACE_MODEL_URL, model_path, &mut on_event)
        .with_context(|| format!("failed to download face model to {}", model_path.display()))
}

fn download_to_path<F>(url: &str, dest: &Path, on_event: &mut F) -> anyhow::Result<()>
where
    F: FnMut(DownloadEvent),
{
    log::info!("downloading face model from {url} to {}", dest.display());

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total = response.content_length();
    on_event(DownloadEvent::Started { total });

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        on_event(DownloadEvent::Progress { downloaded, total });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(DownloadEvent::Finished);
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} downloading model") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_model_skips_download() {
        let dir = std::env::temp_dir().join(format!("webcam-filters-model-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(FACE_MODEL_FILENAME);
        fs::write(&path, b"onnx").unwrap();

        let mut events = Vec::new();
        ensure_face_model_ready(&path, |event| events.push(event)).unwrap();
        assert_eq!(events, [DownloadEvent::AlreadyPresent, DownloadEvent::Finished]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn default_path_lives_under_models() {
        assert!(default_face_model_path().starts_with("models"));
    }
}
