use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::index::Catalogue;
use crate::{DateGroup, OrganizeReport};

/// One answer from the labeling channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReply {
    /// Leave the date unlabeled; it will be offered again next run.
    Skip,
    /// Stop asking for the rest of this run.
    Quit,
    Label(String),
}

/// Channel asking the user for event names, one date-group at a time.
/// Abstract so the loop can run headless against scripted replies.
pub trait EventPrompt {
    fn ask(&mut self, date: &str, photos: u64, videos: u64) -> PromptReply;
}

/// Offer an event name for every unlabeled date in the just-processed batch.
/// Labeling renames the date folder and records the label in the catalogue;
/// once labeled, a date is never asked again.
pub fn annotate_events(
    root: &Path,
    groups: &BTreeMap<String, DateGroup>,
    prompt: &mut dyn EventPrompt,
    report: &mut OrganizeReport,
) {
    if groups.is_empty() {
        return;
    }

    let catalogue = Catalogue::load(root);
    let mut new_labels: BTreeMap<String, String> = BTreeMap::new();

    for (date, counts) in groups {
        if let Some(existing) = catalogue.events.get(date) {
            log::info!("{} already labeled \"{}\"", date, existing);
            continue;
        }

        match prompt.ask(date, counts.photos, counts.videos) {
            PromptReply::Skip => continue,
            PromptReply::Quit => break,
            PromptReply::Label(label) => {
                rename_date_folder(root, date, &label, report);
                log::info!("labeled {} as \"{}\"", date, label);
                new_labels.insert(date.clone(), label);
            }
        }
    }

    if !new_labels.is_empty() {
        // Re-read before writing: the relocation phase persisted already,
        // so only the events map is merged here.
        let mut current = Catalogue::load(root);
        current.events.extend(new_labels);
        if let Err(e) = current.persist(root) {
            report.error(format!("failed to record event labels: {}", e));
        }
    }
}

/// Rename `root/YYYY/MM/YYYY-MM-DD` to `YYYY-MM-DD_<label>`. Every failure
/// mode is a warning; the label is recorded regardless.
fn rename_date_folder(root: &Path, date: &str, label: &str, report: &mut OrganizeReport) {
    let (Some(year), Some(month)) = (date.get(0..4), date.get(5..7)) else {
        return;
    };
    let month_dir = root.join(year).join(month);
    let old_folder = month_dir.join(date);

    if !old_folder.is_dir() {
        report.warn(format!(
            "date folder missing, label recorded anyway: {}",
            old_folder.display()
        ));
        return;
    }

    let new_folder = month_dir.join(format!("{}_{}", date, label));
    if new_folder.exists() {
        report.warn(format!(
            "target folder already exists, not renaming: {}",
            new_folder.display()
        ));
        return;
    }

    if let Err(e) = fs::rename(&old_folder, &new_folder) {
        report.warn(format!(
            "failed to rename {}: {}",
            old_folder.display(),
            e
        ));
    } else {
        log::debug!("renamed date folder to {}", new_folder.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Scripted {
        replies: Vec<PromptReply>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(replies: Vec<PromptReply>) -> Self {
            Self {
                replies,
                asked: Vec::new(),
            }
        }
    }

    impl EventPrompt for Scripted {
        fn ask(&mut self, date: &str, _photos: u64, _videos: u64) -> PromptReply {
            self.asked.push(date.to_string());
            if self.replies.is_empty() {
                PromptReply::Quit
            } else {
                self.replies.remove(0)
            }
        }
    }

    fn groups(dates: &[&str]) -> BTreeMap<String, DateGroup> {
        dates
            .iter()
            .map(|d| {
                (
                    d.to_string(),
                    DateGroup {
                        photos: 1,
                        videos: 0,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_label_renames_folder_and_updates_catalogue() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("2025/02/2025-02-26/photos")).unwrap();

        let mut prompt = Scripted::new(vec![PromptReply::Label("Kyoto Trip".to_string())]);
        let mut report = OrganizeReport::default();
        annotate_events(root.path(), &groups(&["2025-02-26"]), &mut prompt, &mut report);

        assert!(root.path().join("2025/02/2025-02-26_Kyoto Trip").is_dir());
        assert!(!root.path().join("2025/02/2025-02-26").exists());
        let cat = Catalogue::load(root.path());
        assert_eq!(cat.events["2025-02-26"], "Kyoto Trip");
        assert_eq!(report.warnings, 0);
    }

    #[test]
    fn test_labeled_dates_are_not_asked_again() {
        let root = tempdir().unwrap();
        let mut cat = Catalogue::default();
        cat.events
            .insert("2025-02-26".to_string(), "Kyoto Trip".to_string());
        cat.persist(root.path()).unwrap();

        let mut prompt = Scripted::new(vec![]);
        let mut report = OrganizeReport::default();
        annotate_events(root.path(), &groups(&["2025-02-26"]), &mut prompt, &mut report);

        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_skip_leaves_date_unlabeled() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("2025/02/2025-02-26/photos")).unwrap();

        let mut prompt = Scripted::new(vec![PromptReply::Skip]);
        let mut report = OrganizeReport::default();
        annotate_events(root.path(), &groups(&["2025-02-26"]), &mut prompt, &mut report);

        assert!(root.path().join("2025/02/2025-02-26").is_dir());
        assert!(Catalogue::load(root.path()).events.is_empty());
    }

    #[test]
    fn test_quit_stops_remaining_prompts() {
        let root = tempdir().unwrap();
        let mut prompt = Scripted::new(vec![PromptReply::Quit]);
        let mut report = OrganizeReport::default();
        annotate_events(
            root.path(),
            &groups(&["2025-02-26", "2025-02-27"]),
            &mut prompt,
            &mut report,
        );

        assert_eq!(prompt.asked, vec!["2025-02-26"]);
        assert!(Catalogue::load(root.path()).events.is_empty());
    }

    #[test]
    fn test_missing_folder_still_records_label() {
        let root = tempdir().unwrap();
        let mut prompt = Scripted::new(vec![PromptReply::Label("Hike".to_string())]);
        let mut report = OrganizeReport::default();
        annotate_events(root.path(), &groups(&["2025-02-26"]), &mut prompt, &mut report);

        assert_eq!(report.warnings, 1);
        assert_eq!(Catalogue::load(root.path()).events["2025-02-26"], "Hike");
    }

    #[test]
    fn test_existing_target_folder_refuses_rename() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("2025/02/2025-02-26")).unwrap();
        fs::create_dir_all(root.path().join("2025/02/2025-02-26_Hike")).unwrap();

        let mut prompt = Scripted::new(vec![PromptReply::Label("Hike".to_string())]);
        let mut report = OrganizeReport::default();
        annotate_events(root.path(), &groups(&["2025-02-26"]), &mut prompt, &mut report);

        // Both folders untouched, label recorded, warning counted.
        assert!(root.path().join("2025/02/2025-02-26").is_dir());
        assert!(root.path().join("2025/02/2025-02-26_Hike").is_dir());
        assert_eq!(report.warnings, 1);
        assert_eq!(Catalogue::load(root.path()).events["2025-02-26"], "Hike");
    }
}
