//! Course progress aggregation.
//!
//! Completion is derived purely from quiz attempts: a lesson counts as
//! completed when its most recent attempt passed. Video lessons have no
//! completion record and always report incomplete.

use std::collections::HashMap;

use crate::model::{Course, LessonId, QuizAttempt};

/// Displayed status of one lesson inside a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonStatus {
    pub lesson_id: LessonId,
    pub title: String,
    pub is_quiz: bool,
    pub completed: bool,
    /// Score of the most recent attempt, if any.
    pub latest_score: Option<u8>,
}

/// Aggregated progress of one user across a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    /// `round(100 × completed / total)`; 0 for a course with no lessons.
    pub percent: u8,
    pub lessons: Vec<LessonStatus>,
}

/// Keeps the most recent attempt per lesson from a most-recent-first list.
///
/// The attempt repository returns one ordered result set per course; this
/// is the client-side grouping step that picks the first row per lesson.
#[must_use]
pub fn latest_per_lesson(attempts: &[QuizAttempt]) -> HashMap<LessonId, &QuizAttempt> {
    let mut latest: HashMap<LessonId, &QuizAttempt> = HashMap::new();
    for attempt in attempts {
        latest.entry(attempt.lesson_id()).or_insert(attempt);
    }
    latest
}

/// Aggregates per-lesson status and the overall percentage for `course`.
#[must_use]
pub fn aggregate(course: &Course, latest: &HashMap<LessonId, &QuizAttempt>) -> CourseProgress {
    let mut lessons = Vec::with_capacity(course.lesson_count());
    let mut completed = 0_usize;

    for lesson in course.lessons() {
        let attempt = latest.get(&lesson.id);
        let is_quiz = lesson.is_quiz();
        // Only quiz lessons can complete; a stray attempt recorded against a
        // video lesson does not count.
        let done = is_quiz && attempt.is_some_and(|a| a.passed());
        if done {
            completed += 1;
        }
        lessons.push(LessonStatus {
            lesson_id: lesson.id,
            title: lesson.title.clone(),
            is_quiz,
            completed: done,
            latest_score: attempt.map(|a| a.score()),
        });
    }

    let total = lessons.len();
    let percent = if total == 0 {
        0
    } else {
        (100.0 * completed as f64 / total as f64).round() as u8
    };

    CourseProgress {
        total_lessons: total,
        completed_lessons: completed,
        percent,
        lessons,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AnswerMap, AttemptId, Course, CourseId, Lesson, LessonKind, Module, ModuleId, QuizAttempt,
        QuizLesson, UserId, VideoLesson,
    };
    use crate::time::fixed_now;
    use chrono::Duration;
    use url::Url;

    fn course() -> Course {
        Course {
            id: CourseId::new(1),
            title: "Toán 12".into(),
            description: None,
            category: "Toán".into(),
            author: "Thầy Hà".into(),
            price_vnd: 599_000,
            modules: vec![Module {
                id: ModuleId::new(1),
                title: "Chương 1".into(),
                lessons: vec![
                    Lesson {
                        id: LessonId::new(1),
                        title: "Bài giảng".into(),
                        kind: LessonKind::Video(VideoLesson {
                            url: Url::parse("https://videos.example.com/1.mp4").unwrap(),
                            notes: None,
                            attachments: vec![],
                        }),
                    },
                    Lesson {
                        id: LessonId::new(2),
                        title: "Kiểm tra".into(),
                        kind: LessonKind::Quiz(QuizLesson {
                            questions: vec![],
                            passing_score: 70,
                            time_limit_secs: None,
                        }),
                    },
                ],
            }],
            created_at: fixed_now(),
        }
    }

    fn attempt(id: u64, lesson: u64, score: u8, passed: bool, minutes_ago: i64) -> QuizAttempt {
        QuizAttempt::from_persisted(
            AttemptId::new(id),
            UserId::new("user_1"),
            CourseId::new(1),
            LessonId::new(lesson),
            AnswerMap::new(),
            score,
            passed,
            fixed_now() - Duration::minutes(minutes_ago),
        )
    }

    #[test]
    fn empty_course_reports_zero_percent() {
        let mut c = course();
        c.modules.clear();
        let progress = aggregate(&c, &HashMap::new());
        assert_eq!(progress.total_lessons, 0);
        assert_eq!(progress.percent, 0);
    }

    #[test]
    fn passing_latest_attempt_completes_a_quiz_lesson() {
        let c = course();
        let attempts = vec![attempt(2, 2, 80, true, 0), attempt(1, 2, 40, false, 60)];
        let latest = latest_per_lesson(&attempts);
        let progress = aggregate(&c, &latest);

        assert_eq!(progress.total_lessons, 2);
        assert_eq!(progress.completed_lessons, 1);
        assert_eq!(progress.percent, 50);
        assert_eq!(progress.lessons[1].latest_score, Some(80));
        assert!(progress.lessons[1].completed);
    }

    #[test]
    fn latest_failed_retake_undoes_displayed_completion() {
        // The most recent attempt wins, not the best one.
        let c = course();
        let attempts = vec![attempt(2, 2, 40, false, 0), attempt(1, 2, 90, true, 60)];
        let latest = latest_per_lesson(&attempts);
        let progress = aggregate(&c, &latest);

        assert_eq!(progress.completed_lessons, 0);
        assert_eq!(progress.lessons[1].latest_score, Some(40));
    }

    #[test]
    fn video_lessons_never_complete() {
        let c = course();
        // Even a recorded passing attempt against the video lesson id is
        // ignored for completion.
        let attempts = vec![attempt(1, 1, 100, true, 0)];
        let latest = latest_per_lesson(&attempts);
        let progress = aggregate(&c, &latest);

        assert!(!progress.lessons[0].completed);
        assert_eq!(progress.completed_lessons, 0);
    }

    #[test]
    fn percentage_rounds_to_nearest_integer() {
        let mut c = course();
        // Three quiz lessons, one passed → 33%.
        c.modules[0].lessons = (1..=3)
            .map(|i| Lesson {
                id: LessonId::new(i),
                title: format!("Kiểm tra {i}"),
                kind: LessonKind::Quiz(QuizLesson {
                    questions: vec![],
                    passing_score: 70,
                    time_limit_secs: None,
                }),
            })
            .collect();
        let attempts = vec![attempt(1, 1, 90, true, 0)];
        let latest = latest_per_lesson(&attempts);
        assert_eq!(aggregate(&c, &latest).percent, 33);
    }
}
