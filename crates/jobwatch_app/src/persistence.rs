use std::fs;
use std::io::Write;
use std::path::Path;

use jobwatch_logging::{watch_error, watch_info, watch_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

const STATE_FILENAME: &str = ".jobwatch_view.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedView {
    fragment: String,
}

/// Returns the last persisted view fragment, or `None` when there is none
/// or it cannot be read.
pub(crate) fn load_fragment(state_dir: &Path) -> Option<String> {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            watch_warn!("Failed to read persisted view from {:?}: {}", path, err);
            return None;
        }
    };

    let view: PersistedView = match ron::from_str(&content) {
        Ok(view) => view,
        Err(err) => {
            watch_warn!("Failed to parse persisted view from {:?}: {}", path, err);
            return None;
        }
    };

    watch_info!("Restored view from {:?}", path);
    Some(view.fragment)
}

pub(crate) fn save_fragment(state_dir: &Path, fragment: &str) {
    if let Err(err) = fs::create_dir_all(state_dir) {
        watch_error!("Failed to create state dir {:?}: {}", state_dir, err);
        return;
    }

    let view = PersistedView {
        fragment: fragment.to_string(),
    };
    let content = match ron::ser::to_string_pretty(&view, ron::ser::PrettyConfig::new()) {
        Ok(text) => text,
        Err(err) => {
            watch_error!("Failed to serialize view: {}", err);
            return;
        }
    };

    if let Err(err) = write_atomic(state_dir, &content) {
        watch_error!("Failed to write view to {:?}: {}", state_dir, err);
    }
}

fn write_atomic(state_dir: &Path, content: &str) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(state_dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(state_dir.join(STATE_FILENAME))
        .map_err(|err| err.error)?;
    Ok(())
}
