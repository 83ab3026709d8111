use std::collections::HashSet;

use crate::curriculum::{lesson_key, Course, Enrollment};

/// Which record is authoritative for "which lessons has this user
/// completed". The enrollment's own list is scoped per-user already and is
/// the default; `CompletedBy` scans the denormalized per-lesson audience
/// lists instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Enrollment,
    CompletedBy,
}

impl CompletionSource {
    pub fn parse(s: &str) -> Option<CompletionSource> {
        match s {
            "enrollment" => Some(CompletionSource::Enrollment),
            "completedBy" => Some(CompletionSource::CompletedBy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionSource::Enrollment => "enrollment",
            CompletionSource::CompletedBy => "completedBy",
        }
    }
}

pub fn total_lesson_count(course: &Course) -> usize {
    course.units.iter().map(|u| u.lessons.len()).sum()
}

pub fn completed_count(course: &Course, completed_lesson_ids: &HashSet<String>) -> usize {
    let mut count = 0;
    for (ui, unit) in course.units.iter().enumerate() {
        for (li, lesson) in unit.lessons.iter().enumerate() {
            if completed_lesson_ids.contains(&lesson_key(lesson, ui, li)) {
                count += 1;
            }
        }
    }
    count
}

/// Integer percentage in [0, 100], round half-up. A course with no lessons
/// reports 0, not an error.
pub fn progress_percentage(course: &Course, completed_lesson_ids: &HashSet<String>) -> i64 {
    let total = total_lesson_count(course);
    if total == 0 {
        return 0;
    }
    let completed = completed_count(course, completed_lesson_ids).min(total);
    (100.0 * completed as f64 / total as f64).round() as i64
}

pub fn remaining_lesson_count(course: &Course, completed_lesson_ids: &HashSet<String>) -> usize {
    total_lesson_count(course).saturating_sub(completed_count(course, completed_lesson_ids))
}

/// The one place course duration is aggregated. The course-level `duration`
/// field is stamped from this at save time and is display-only elsewhere.
pub fn total_duration_minutes(course: &Course) -> i64 {
    course
        .units
        .iter()
        .flat_map(|u| u.lessons.iter())
        .map(|l| l.duration)
        .sum()
}

pub fn format_duration(total_minutes: i64) -> String {
    let total = total_minutes.max(0);
    let hours = total / 60;
    let minutes = total % 60;
    if hours > 0 && minutes > 0 {
        format!("{} hr {} min", hours, minutes)
    } else if hours > 0 {
        format!("{} hr", hours)
    } else {
        format!("{} min", minutes)
    }
}

/// Resolve the completed-lesson set for one user. With the default
/// `Enrollment` source the enrollment's own list wins when the record is
/// present; a missing record falls back to scanning `completedBy`.
pub fn completed_lesson_ids(
    course: &Course,
    enrollment: Option<&Enrollment>,
    user_id: &str,
    source: CompletionSource,
) -> HashSet<String> {
    match (source, enrollment) {
        (CompletionSource::Enrollment, Some(e)) => {
            e.completed_lessons.iter().cloned().collect()
        }
        _ => scan_completed_by(course, user_id),
    }
}

fn scan_completed_by(course: &Course, user_id: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    for (ui, unit) in course.units.iter().enumerate() {
        for (li, lesson) in unit.lessons.iter().enumerate() {
            if lesson.completed_by.iter().any(|u| u == user_id) {
                out.insert(lesson_key(lesson, ui, li));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::{Lesson, Level, Unit};

    fn lesson(id: Option<&str>, duration: i64) -> Lesson {
        Lesson {
            id: id.map(|s| s.to_string()),
            title: "L".to_string(),
            content: String::new(),
            duration,
            resources: Vec::new(),
            quizzes: Vec::new(),
            is_completed: false,
            completed_by: Vec::new(),
            completed_at: None,
        }
    }

    fn course(units: Vec<Vec<Lesson>>) -> Course {
        Course {
            id: Some("c1".to_string()),
            title: "Course".to_string(),
            description: String::new(),
            subject: "math".to_string(),
            grade: 6,
            level: Level::Beginner,
            image_url: None,
            duration: 0,
            gamification: None,
            units: units
                .into_iter()
                .enumerate()
                .map(|(i, lessons)| Unit {
                    id: Some(format!("u{}", i)),
                    title: format!("Unit {}", i),
                    description: None,
                    lessons,
                })
                .collect(),
        }
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn percentage_two_of_six_rounds_to_33() {
        let c = course(vec![
            vec![lesson(Some("l1"), 10), lesson(Some("l2"), 10), lesson(Some("l3"), 10)],
            vec![lesson(Some("l4"), 10), lesson(Some("l5"), 10), lesson(Some("l6"), 10)],
        ]);
        assert_eq!(total_lesson_count(&c), 6);
        assert_eq!(progress_percentage(&c, &set(&["l2", "l5"])), 33);
        assert_eq!(remaining_lesson_count(&c, &set(&["l2", "l5"])), 4);
    }

    #[test]
    fn empty_course_is_zero_everywhere() {
        let c = course(vec![]);
        assert_eq!(total_lesson_count(&c), 0);
        assert_eq!(progress_percentage(&c, &set(&["l1"])), 0);
        assert_eq!(total_duration_minutes(&c), 0);
        assert_eq!(remaining_lesson_count(&c, &set(&[])), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        // 1 of 8 = 12.5 -> 13
        let c = course(vec![(0..8).map(|i| lesson(Some(&format!("l{}", i)), 5)).collect()]);
        assert_eq!(progress_percentage(&c, &set(&["l0"])), 13);
    }

    #[test]
    fn percentage_monotone_as_completed_set_grows() {
        let c = course(vec![(0..7).map(|i| lesson(Some(&format!("l{}", i)), 5)).collect()]);
        let mut done: HashSet<String> = HashSet::new();
        let mut last = progress_percentage(&c, &done);
        for i in 0..7 {
            done.insert(format!("l{}", i));
            let next = progress_percentage(&c, &done);
            assert!(next >= last, "{} < {} after adding l{}", next, last, i);
            last = next;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn unsaved_lessons_count_by_positional_key() {
        let c = course(vec![vec![lesson(None, 5), lesson(None, 5)], vec![lesson(None, 5)]]);
        assert_eq!(completed_count(&c, &set(&["0-1", "1-0"])), 2);
        assert_eq!(progress_percentage(&c, &set(&["0-1", "1-0"])), 67);
    }

    #[test]
    fn duration_sum_and_display() {
        let c = course(vec![vec![lesson(Some("a"), 15), lesson(Some("b"), 30), lesson(Some("c"), 45)]]);
        assert_eq!(total_duration_minutes(&c), 90);
        assert_eq!(format_duration(90), "1 hr 30 min");
        assert_eq!(format_duration(120), "2 hr");
        assert_eq!(format_duration(45), "45 min");
        assert_eq!(format_duration(0), "0 min");
    }

    #[test]
    fn duration_invariant_under_reorder() {
        let mut c = course(vec![
            vec![lesson(Some("a"), 15), lesson(Some("b"), 30)],
            vec![lesson(Some("c"), 45)],
        ]);
        let before = total_duration_minutes(&c);
        let unit = c.units.remove(0);
        c.units.push(unit);
        c.units[0].lessons.reverse();
        assert_eq!(total_duration_minutes(&c), before);
    }

    #[test]
    fn completion_source_resolution() {
        let mut c = course(vec![vec![lesson(Some("l1"), 5), lesson(Some("l2"), 5)]]);
        c.units[0].lessons[1].completed_by.push("user9".to_string());
        let enrollment = Enrollment {
            id: Some("e1".to_string()),
            course_id: Some("c1".to_string()),
            course: None,
            progress: 50,
            completed_lessons: vec!["l1".to_string()],
            is_completed: false,
            enrolled_at: None,
            completed_at: None,
        };

        let from_enrollment =
            completed_lesson_ids(&c, Some(&enrollment), "user9", CompletionSource::Enrollment);
        assert_eq!(from_enrollment, set(&["l1"]));

        let from_scan =
            completed_lesson_ids(&c, Some(&enrollment), "user9", CompletionSource::CompletedBy);
        assert_eq!(from_scan, set(&["l2"]));

        // No enrollment record: the enrollment source falls back to the scan.
        let fallback = completed_lesson_ids(&c, None, "user9", CompletionSource::Enrollment);
        assert_eq!(fallback, set(&["l2"]));
    }
}
