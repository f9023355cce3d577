mod ui;

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use mood_diary::connectivity::{spawn_monitor, OnlineFlag};
use mood_diary::entry::DEFAULT_INTENSITY;
use mood_diary::locks::EntryLocks;
use mood_diary::remote::{HttpRemote, RemoteEntries};
use mood_diary::settings::get_settings;
use mood_diary::store::open_store;
use mood_diary::worker::SyncWorker;
use mood_diary::{telemetry, EntryController, EntryError, EntryPatch, SyncCoordinator, SyncError};
use ui::{Action, UI};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = get_settings().map_err(|e| eyre!("Failed to load settings: {}", e))?;
    std::fs::create_dir_all(&settings.log.dir)?;
    let _log_guard = telemetry::init_subscriber(settings.debug, &settings.log.dir)?;

    let store = open_store(settings.storage.backend, &settings.storage.data_dir)
        .await
        .map_err(|e| eyre!("Failed to open diary: {}", e))?;
    let remote: Arc<dyn RemoteEntries> = Arc::new(HttpRemote::new(
        &settings.remote.base_url,
        settings.remote.token.clone(),
        settings.remote.timeout(),
    )?);
    let online = OnlineFlag::new(false);
    let coordinator = Arc::new(SyncCoordinator::new(
        store,
        remote.clone(),
        Arc::new(online.clone()),
        EntryLocks::new(),
    ));
    let (sync, worker) = SyncWorker::spawn(coordinator.clone());
    // First probe fires immediately and queues the startup pass once online.
    let monitor = spawn_monitor(remote, online, sync.clone(), settings.remote.probe_interval());
    let controller = EntryController::new(coordinator, sync.clone(), settings.limits.max_notes_chars);

    let mut ui = UI::new()?;
    let result = run(&mut ui, &controller).await;
    drop(ui);

    monitor.abort();
    if tokio::time::timeout(SHUTDOWN_GRACE, sync.flush()).await.is_err() {
        tracing::warn!("Pending sync did not finish before exit, it resumes on next start");
    }
    drop(controller);
    drop(sync);
    worker.abort();

    result
}

async fn run(ui: &mut UI, controller: &EntryController) -> Result<()> {
    loop {
        let entries = controller.list_entries().await?;
        ui.display(&entries, controller.is_online())?;

        let Some(action) = ui.handle_input(&entries)? else {
            continue;
        };
        match action {
            Action::Write => {
                if let Some(draft) = ui.compose("New Diary Entry", "", None, DEFAULT_INTENSITY)? {
                    match controller.create_entry(&draft.notes, draft.mood, Some(draft.intensity), None).await {
                        Ok(entry) => ui.set_status(format!("Saved, feeling {}", entry.mood.with_emoji())),
                        Err(e) => ui.set_status(describe(&e)),
                    }
                }
            }
            Action::View => {
                ui.view_entries(&entries)?;
            }
            Action::Edit => {
                if let Some(entry) = ui.select_entry(&entries, "Select Entry to Edit")? {
                    if let Some(draft) = ui.compose("Edit Entry", &entry.notes, Some(entry.mood), entry.intensity)? {
                        let patch = EntryPatch {
                            notes: Some(draft.notes),
                            mood: draft.mood,
                            intensity: Some(draft.intensity),
                            date: None,
                        };
                        match controller.update_entry(&entry.id, patch).await {
                            Ok(updated) if updated.updated_at == entry.updated_at => {
                                ui.set_status("Nothing changed")
                            }
                            Ok(updated) => {
                                ui.set_status(format!("Updated, feeling {}", updated.mood.with_emoji()))
                            }
                            Err(e) => ui.set_status(describe(&e)),
                        }
                    }
                }
            }
            Action::Delete => {
                if let Some(entry) = ui.select_entry(&entries, "Select Entry to Delete")? {
                    if ui.confirm("Delete this entry? This cannot be undone.")? {
                        match controller.delete_entry(&entry.id).await {
                            Ok(()) => ui.set_status("Entry deleted"),
                            Err(e) => ui.set_status(describe(&e)),
                        }
                    }
                }
            }
            Action::Insights => {
                let week = controller.summary(Some(chrono::Duration::days(7))).await?;
                let all_time = controller.summary(None).await?;
                ui.display_insights(&week, &all_time)?;
            }
            Action::Sync => match controller.force_sync().await {
                Ok(report) if report.synced_count == 0 => ui.set_status("Everything is synced"),
                Ok(report) => ui.set_status(format!("Synced {} entries", report.synced_count)),
                Err(SyncError::Offline) => ui.set_status("Offline, entries will sync when back online"),
                Err(e) => ui.set_status(e.to_string()),
            },
            Action::Quit => break,
        }
    }

    Ok(())
}

fn describe(error: &EntryError) -> String {
    match error {
        EntryError::Validation(e) => e.to_string(),
        EntryError::NotFound(_) => "That entry no longer exists".to_string(),
        EntryError::Store(e) => format!("Could not save locally: {}", e),
    }
}
