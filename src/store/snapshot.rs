use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use tracing::{debug, info, warn};

use crate::errors::NeedsbookError;

use super::FinanceState;

/// Reads a snapshot: MessagePack with named fields inside an LZ4 frame.
pub fn read_from(reader: impl Read) -> Result<FinanceState, NeedsbookError> {
    let mut decoder = FrameDecoder::new(reader);
    let mut state: FinanceState = rmp_serde::decode::from_read(&mut decoder)?;
    state.repair_id_counter();
    Ok(state)
}

pub fn write_to<W: Write>(writer: W, state: &FinanceState) -> Result<W, NeedsbookError> {
    let mut encoder = FrameEncoder::new(writer);
    rmp_serde::encode::write_named(&mut encoder, state)?;
    Ok(encoder.finish()?)
}

/// Loads the last saved state, or an empty one when nothing was saved yet.
pub fn load(path: &Path) -> Result<FinanceState, NeedsbookError> {
    if !path.exists() {
        info!(path = %path.display(), "no snapshot found, starting with an empty state");
        return Ok(FinanceState::default());
    }
    let file = File::open(path)?;
    let state = read_from(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        months = state.month_needs.len(),
        template_items = state.needs_template.items().len(),
        "snapshot loaded"
    );
    Ok(state)
}

/// Writes the whole state next to `path` and moves it into place, so a failed
/// write never leaves a truncated snapshot behind.
pub fn save(path: &Path, state: &FinanceState) -> Result<(), NeedsbookError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp_path = path.with_extension("tmp");
    if let Err(e) = write_and_move(&tmp_path, path, state) {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            if cleanup.kind() != ErrorKind::NotFound {
                warn!(path = %tmp_path.display(), error = %cleanup, "could not remove temporary snapshot");
            }
        }
        return Err(e);
    }
    debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

fn write_and_move(tmp_path: &Path, path: &Path, state: &FinanceState) -> Result<(), NeedsbookError> {
    let file = File::create(tmp_path)?;
    let mut writer = write_to(BufWriter::new(file), state)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::month::MonthKey;
    use crate::store::confirm::AssumeYes;
    use crate::store::{Action, Store};

    fn sample_state() -> FinanceState {
        let mut store = Store::default();
        let month: MonthKey = "2024-03".parse().unwrap();
        for action in [
            Action::CompleteSetup {
                currency: "EUR".into(),
            },
            Action::AddTemplateItem {
                name: "Rent".into(),
                amount: Decimal::new(4000, 0),
                start: None,
                end: Some("2025-12".parse().unwrap()),
            },
            Action::CreateFromTemplate { month },
            Action::CreateFromTemplate {
                month: "2024-04".parse().unwrap(),
            },
            Action::DeleteItem {
                month: "2024-04".parse().unwrap(),
                id: crate::needs::NeedId(3),
            },
        ] {
            store.dispatch(action, &mut AssumeYes).unwrap();
        }
        store.state().clone()
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = load(&dir.path().join("absent.db")).unwrap();
        assert_eq!(state, FinanceState::default());
    }

    #[test]
    fn saved_state_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("needs.db");
        let state = sample_state();

        save(&path, &state).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, state);
        assert!(loaded.month(MonthKey::new(2024, 4).unwrap()).unwrap().is_empty());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("needs.db");
        save(&path, &FinanceState::default()).unwrap();
        let state = sample_state();
        save(&path, &state).unwrap();
        assert_eq!(load(&path).unwrap(), state);
    }

    #[test]
    fn failed_save_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory where the snapshot should go makes the final rename fail
        let path = dir.path().join("needs.db");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        assert!(save(&path, &sample_state()).is_err());
        assert!(!path.with_extension("tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("needs.db");
        fs::write(&path, b"definitely not a snapshot").unwrap();
        assert!(load(&path).is_err());
    }
}
