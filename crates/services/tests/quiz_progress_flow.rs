use havamath_core::model::{
    Answer, AnswerMap, CourseDraft, LessonDraft, LessonDraftKind, ModuleDraft, QuestionDraft,
    QuestionKind, QuizDraft, UserId, VideoDraft,
};
use havamath_core::time::fixed_now;
use services::{AppServices, Clock};
use storage::repository::Storage;

async fn app(db: &str) -> AppServices {
    let storage = Storage::sqlite(&format!("sqlite:file:{db}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite");
    AppServices::from_storage(&storage, Clock::fixed(fixed_now()))
}

fn course_draft() -> CourseDraft {
    CourseDraft {
        title: "Toán 12".into(),
        description: None,
        category: "Toán".into(),
        author: "Thầy Hà".into(),
        price_vnd: 599_000,
        modules: vec![ModuleDraft {
            title: "Chương 1".into(),
            lessons: vec![
                LessonDraft {
                    title: "Bài giảng".into(),
                    kind: LessonDraftKind::Video(VideoDraft {
                        url: "https://videos.example.com/1.mp4".into(),
                        notes: None,
                        attachments: vec![],
                    }),
                },
                LessonDraft {
                    title: "Kiểm tra giữa chương".into(),
                    kind: LessonDraftKind::Quiz(QuizDraft {
                        questions: vec![
                            QuestionDraft {
                                points: 1,
                                kind: QuestionKind::SingleChoice {
                                    choices: vec!["21".into(), "22".into()],
                                    correct: "22".into(),
                                },
                            },
                            QuestionDraft {
                                points: 1,
                                kind: QuestionKind::FillInBlank { answer: "96".into() },
                            },
                        ],
                        passing_score: 70,
                        time_limit_secs: Some(600),
                    }),
                },
                LessonDraft {
                    title: "Kiểm tra cuối chương".into(),
                    kind: LessonDraftKind::Quiz(QuizDraft {
                        questions: vec![QuestionDraft {
                            points: 2,
                            kind: QuestionKind::Essay,
                        }],
                        passing_score: 70,
                        time_limit_secs: None,
                    }),
                },
            ],
        }],
    }
}

#[tokio::test]
async fn submissions_drive_dashboard_progress() {
    let app = app("memdb_quiz_progress").await;
    let student = UserId::new("user_1");

    let course_id = app.catalog().create_course(course_draft()).await.unwrap();
    let course = app.catalog().get_course(course_id).await.unwrap().unwrap();

    let quiz = course
        .lessons()
        .find(|l| l.is_quiz())
        .expect("quiz lesson");
    let questions = &quiz.quiz().unwrap().questions;

    let mut answers = AnswerMap::new();
    answers.insert(questions[0].id, Answer::Choice("22".into()));
    answers.insert(questions[1].id, Answer::Text("96".into()));

    let submission = app
        .quizzes()
        .submit(Some(&student), course_id, quiz.id, answers)
        .await
        .unwrap();
    assert_eq!(submission.outcome.score, 100);
    assert!(submission.attempt_id.is_some());

    let progress = app
        .progress()
        .course_progress(&student, course_id)
        .await
        .unwrap();
    // One of three lessons done: the video never completes and the essay
    // quiz has not been attempted.
    assert_eq!(progress.total_lessons, 3);
    assert_eq!(progress.completed_lessons, 1);
    assert_eq!(progress.percent, 33);
    assert_eq!(progress.lessons[1].latest_score, Some(100));
}

#[tokio::test]
async fn essay_only_quiz_cannot_reach_the_pass_mark() {
    let app = app("memdb_quiz_essay").await;
    let student = UserId::new("user_1");

    let course_id = app.catalog().create_course(course_draft()).await.unwrap();
    let course = app.catalog().get_course(course_id).await.unwrap().unwrap();
    let essay_quiz = course
        .lessons()
        .filter(|l| l.is_quiz())
        .nth(1)
        .expect("essay lesson");
    let question_id = essay_quiz.quiz().unwrap().questions[0].id;

    let mut answers = AnswerMap::new();
    answers.insert(question_id, Answer::Text("Bài luận của em".into()));

    let submission = app
        .quizzes()
        .submit(Some(&student), course_id, essay_quiz.id, answers)
        .await
        .unwrap();
    assert_eq!(submission.outcome.score, 0);
    assert!(!submission.outcome.passed);
    assert_eq!(submission.outcome.total_points, 2);

    let progress = app
        .progress()
        .course_progress(&student, course_id)
        .await
        .unwrap();
    assert!(!progress.lessons[2].completed);
    assert_eq!(progress.lessons[2].latest_score, Some(0));
}

#[tokio::test]
async fn anonymous_submissions_leave_no_trace() {
    let app = app("memdb_quiz_anon").await;
    let course_id = app.catalog().create_course(course_draft()).await.unwrap();
    let course = app.catalog().get_course(course_id).await.unwrap().unwrap();
    let quiz = course.lessons().find(|l| l.is_quiz()).unwrap();

    let submission = app
        .quizzes()
        .submit(None, course_id, quiz.id, AnswerMap::new())
        .await
        .unwrap();
    assert_eq!(submission.outcome.score, 0);
    assert!(submission.attempt_id.is_none());

    let progress = app
        .progress()
        .course_progress(&UserId::new("user_1"), course_id)
        .await
        .unwrap();
    assert!(progress.lessons.iter().all(|l| l.latest_score.is_none()));
}
