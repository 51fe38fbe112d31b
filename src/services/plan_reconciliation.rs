// Keeps recorded progress consistent with a plan that was edited mid-program.

use crate::models::{ExerciseProgress, ExerciseTemplate, SetRecord};

/// Fit an exercise's recorded sets to a replacement template.
///
/// Equal count keeps every set and refreshes reps/rest on the ones not yet
/// performed. A smaller target keeps the first N sets as they are. A larger
/// target keeps the existing sets and appends fresh ones.
pub fn reconcile_sets(progress: &mut ExerciseProgress, template: &ExerciseTemplate) {
    let existing = progress.sets.len();
    let target = template.sets;

    if existing == target {
        for set in progress.sets.iter_mut().filter(|set| !set.completed) {
            set.reps = template.reps.clone();
            set.rest_time = Some(template.rest_seconds);
        }
    } else if target < existing {
        progress.sets.truncate(target);
    } else {
        progress
            .sets
            .extend((existing + 1..=target).map(|n| SetRecord::from_template(n as u32, template)));
    }

    progress.refresh_completed();
}

/// Rewrite the rep target of every set that has not been performed yet.
pub fn apply_reps_change(progress: &mut ExerciseProgress, reps: &str) {
    for set in progress.sets.iter_mut().filter(|set| !set.completed) {
        set.reps = reps.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(sets: usize, reps: &str, rest: u32) -> ExerciseTemplate {
        ExerciseTemplate {
            sets,
            reps: reps.to_string(),
            rest_seconds: rest,
        }
    }

    fn progress_with_first_done(sets: usize) -> ExerciseProgress {
        let mut progress = ExerciseProgress::from_template(&template(sets, "10", 60));
        progress.sets[0].completed = true;
        progress.sets[0].reps = "9".to_string();
        progress.refresh_completed();
        progress
    }

    #[test]
    fn test_same_count_refreshes_pending_sets_only() {
        let mut progress = progress_with_first_done(3);

        reconcile_sets(&mut progress, &template(3, "6", 120));

        assert_eq!(progress.sets.len(), 3);
        assert_eq!(progress.sets[0].reps, "9");
        assert_eq!(progress.sets[0].rest_time, Some(60));
        assert_eq!(progress.sets[1].reps, "6");
        assert_eq!(progress.sets[2].rest_time, Some(120));
    }

    #[test]
    fn test_fewer_sets_truncates_and_keeps_completion() {
        let mut progress = progress_with_first_done(4);

        reconcile_sets(&mut progress, &template(1, "6", 120));

        assert_eq!(progress.sets.len(), 1);
        assert!(progress.sets[0].completed);
        assert_eq!(progress.sets[0].reps, "9");
        assert!(progress.completed);
    }

    #[test]
    fn test_more_sets_appends_fresh_ones() {
        let mut progress = progress_with_first_done(2);

        reconcile_sets(&mut progress, &template(4, "12", 90));

        assert_eq!(progress.sets.len(), 4);
        assert_eq!(progress.sets[1].reps, "10");
        assert_eq!(progress.sets[2].set_number, 3);
        assert_eq!(progress.sets[3].set_number, 4);
        assert_eq!(progress.sets[3].reps, "12");
        assert_eq!(progress.sets[3].rest_time, Some(90));
        assert!(!progress.completed);
    }

    #[test]
    fn test_reps_change_skips_completed_sets() {
        let mut progress = progress_with_first_done(3);

        apply_reps_change(&mut progress, "15");

        assert_eq!(progress.sets[0].reps, "9");
        assert!(progress.sets[1..].iter().all(|set| set.reps == "15"));
    }
}
