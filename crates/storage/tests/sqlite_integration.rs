use chrono::Duration;
use havamath_core::model::{
    Answer, AnswerMap, CourseDraft, CourseId, LessonDraft, LessonDraftKind, LessonId, ModuleDraft,
    PaymentMethod, PaymentStatus, QuestionDraft, QuestionId, QuestionKind, QuizDraft, RedeemError,
    Sender, UserId, ValidatedCourse, VideoDraft,
};
use havamath_core::time::fixed_now;
use storage::repository::{
    AttemptRepository, ChatRepository, ClaimOutcome, CourseRepository, DeactivateOutcome,
    EnrollmentRepository, NewAttemptRecord, NewCodeRecord, NewMessageRecord, NewPaymentRecord,
    PaymentRepository, RedemptionCodeRepository, SettleOutcome, StorageError,
};
use storage::sqlite::SqliteRepository;
use uuid::Uuid;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn sample_course() -> ValidatedCourse {
    CourseDraft {
        title: "Toán 12".into(),
        description: Some("Luyện thi THPT quốc gia".into()),
        category: "Toán".into(),
        author: "Thầy Hà".into(),
        price_vnd: 599_000,
        modules: vec![ModuleDraft {
            title: "Chương 1".into(),
            lessons: vec![
                LessonDraft {
                    title: "Bài giảng mở đầu".into(),
                    kind: LessonDraftKind::Video(VideoDraft {
                        url: "https://videos.example.com/1.mp4".into(),
                        notes: Some("Ghi chú".into()),
                        attachments: vec![],
                    }),
                },
                LessonDraft {
                    title: "Kiểm tra chương 1".into(),
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
                        time_limit_secs: Some(900),
                    }),
                },
            ],
        }],
    }
    .validate(fixed_now())
    .unwrap()
}

fn code_record(code: &str) -> NewCodeRecord {
    NewCodeRecord {
        code: code.into(),
        created_by: UserId::new("admin_1"),
        created_at: fixed_now(),
        expires_at: None,
    }
}

#[tokio::test]
async fn course_tree_round_trips() {
    let repo = connect("memdb_course_roundtrip").await;

    let id = repo.insert_course(&sample_course()).await.expect("insert");
    let course = repo.get_course(id).await.expect("fetch").expect("stored");

    assert_eq!(course.title, "Toán 12");
    assert_eq!(course.price_vnd, 599_000);
    assert_eq!(course.lesson_count(), 2);

    let quiz = course
        .lessons()
        .find(|l| l.is_quiz())
        .and_then(|l| l.quiz())
        .expect("quiz lesson");
    assert_eq!(quiz.questions.len(), 2);
    assert_eq!(quiz.passing_score, 70);
    assert!(matches!(
        quiz.questions[0].kind,
        QuestionKind::SingleChoice { .. }
    ));
}

#[tokio::test]
async fn replace_course_keeps_identity_and_created_at() {
    let repo = connect("memdb_course_replace").await;

    let id = repo.insert_course(&sample_course()).await.expect("insert");
    let before = repo.get_course(id).await.unwrap().unwrap();

    let mut updated = sample_course();
    updated.title = "Toán 12 nâng cao".into();
    updated.created_at = fixed_now() + Duration::days(7);
    repo.replace_course(id, &updated).await.expect("replace");

    let after = repo.get_course(id).await.unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.title, "Toán 12 nâng cao");
    // The original creation timestamp survives tree replacement.
    assert_eq!(after.created_at, before.created_at);

    let missing = repo
        .replace_course(CourseId::new(9_999), &sample_course())
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn attempts_come_back_most_recent_first() {
    let repo = connect("memdb_attempts_order").await;
    let user = UserId::new("user_1");

    for (minutes, score, passed) in [(30_i64, 40_u8, false), (10, 80, true), (20, 60, false)] {
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::new(1), Answer::Choice("22".into()));
        repo.insert_attempt(NewAttemptRecord {
            user_id: user.clone(),
            course_id: CourseId::new(1),
            lesson_id: LessonId::new(5),
            answers,
            score,
            passed,
            submitted_at: fixed_now() - Duration::minutes(minutes),
        })
        .await
        .expect("insert attempt");
    }

    let attempts = repo
        .attempts_for_course(&user, CourseId::new(1))
        .await
        .expect("fetch");
    let scores: Vec<u8> = attempts.iter().map(|a| a.score()).collect();
    assert_eq!(scores, vec![80, 60, 40]);

    let per_lesson = repo
        .attempts_for_lesson(&user, LessonId::new(5))
        .await
        .expect("fetch");
    assert_eq!(per_lesson.len(), 3);
    assert!(per_lesson[0].passed());
}

#[tokio::test]
async fn claim_wins_once_and_writes_the_grant() {
    let repo = connect("memdb_claim").await;
    repo.insert_codes(&[code_record("ABC123XY9Z")])
        .await
        .expect("insert codes");

    let reference = Uuid::new_v4();
    let first = repo
        .claim("ABC123XY9Z", &UserId::new("user_1"), reference, fixed_now())
        .await
        .expect("claim");
    let ClaimOutcome::Claimed { code, grant } = first else {
        panic!("first claim should win");
    };
    assert_eq!(code.redeemed_by(), Some(&UserId::new("user_1")));
    assert_eq!(grant.amount_vnd(), 0);
    assert_eq!(grant.method(), PaymentMethod::RedemptionCode);
    assert!(grant.is_completed());
    assert!(
        repo.has_completed_payment(&UserId::new("user_1"))
            .await
            .unwrap()
    );

    let second = repo
        .claim(
            "ABC123XY9Z",
            &UserId::new("user_2"),
            Uuid::new_v4(),
            fixed_now(),
        )
        .await
        .expect("claim");
    assert!(matches!(
        second,
        ClaimOutcome::Rejected(RedeemError::AlreadyRedeemed)
    ));
    assert!(
        !repo
            .has_completed_payment(&UserId::new("user_2"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn claim_rejections_are_classified() {
    let repo = connect("memdb_claim_reasons").await;

    let missing = repo
        .claim("NOSUCHCODE", &UserId::new("user_1"), Uuid::new_v4(), fixed_now())
        .await
        .unwrap();
    assert!(matches!(
        missing,
        ClaimOutcome::Rejected(RedeemError::NotFound)
    ));

    repo.insert_codes(&[
        code_record("DEADCODE00"),
        NewCodeRecord {
            code: "EXPIRED000".into(),
            created_by: UserId::new("admin_1"),
            created_at: fixed_now() - Duration::days(60),
            expires_at: Some(fixed_now() - Duration::days(1)),
        },
    ])
    .await
    .expect("insert codes");

    let DeactivateOutcome::Deactivated(code) =
        repo.deactivate("DEADCODE00").await.expect("deactivate")
    else {
        panic!("deactivate should succeed");
    };
    assert!(!code.is_active());

    let inactive = repo
        .claim("DEADCODE00", &UserId::new("user_1"), Uuid::new_v4(), fixed_now())
        .await
        .unwrap();
    assert!(matches!(
        inactive,
        ClaimOutcome::Rejected(RedeemError::Inactive)
    ));

    let expired = repo
        .claim("EXPIRED000", &UserId::new("user_1"), Uuid::new_v4(), fixed_now())
        .await
        .unwrap();
    assert!(matches!(
        expired,
        ClaimOutcome::Rejected(RedeemError::Expired)
    ));
}

#[tokio::test]
async fn duplicate_code_insert_conflicts() {
    let repo = connect("memdb_code_conflict").await;
    repo.insert_codes(&[code_record("ABC123XY9Z")])
        .await
        .expect("insert");
    let err = repo
        .insert_codes(&[code_record("ABC123XY9Z")])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn redeemed_code_cannot_be_deactivated() {
    let repo = connect("memdb_deactivate_redeemed").await;
    repo.insert_codes(&[code_record("ABC123XY9Z")])
        .await
        .expect("insert");
    repo.claim("ABC123XY9Z", &UserId::new("user_1"), Uuid::new_v4(), fixed_now())
        .await
        .expect("claim");

    let outcome = repo.deactivate("ABC123XY9Z").await.expect("deactivate");
    assert!(matches!(
        outcome,
        DeactivateOutcome::Rejected(RedeemError::AlreadyRedeemed)
    ));
}

#[tokio::test]
async fn payments_settle_exactly_once() {
    let repo = connect("memdb_settle").await;
    let id = repo
        .insert_payment(NewPaymentRecord {
            user_id: UserId::new("user_1"),
            amount_vnd: 599_000,
            method: PaymentMethod::BankTransfer,
            status: PaymentStatus::Pending,
            reference: Uuid::new_v4(),
            created_at: fixed_now(),
            settled_at: None,
        })
        .await
        .expect("insert");

    let first = repo
        .settle_payment(id, PaymentStatus::Completed, fixed_now())
        .await
        .expect("settle");
    let SettleOutcome::Settled(payment) = first else {
        panic!("first settle should win");
    };
    assert!(payment.is_completed());

    let second = repo
        .settle_payment(id, PaymentStatus::Failed, fixed_now())
        .await
        .expect("settle");
    let SettleOutcome::AlreadySettled(payment) = second else {
        panic!("second settle should be rejected");
    };
    assert!(payment.is_completed());

    let pending = repo
        .list_payments_by_status(PaymentStatus::Pending, 10)
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn enrollment_is_idempotent_per_user_course() {
    let repo = connect("memdb_enroll").await;
    let id = repo.insert_course(&sample_course()).await.expect("insert");
    let user = UserId::new("user_1");

    let first = repo
        .ensure_enrollment(&user, id, fixed_now())
        .await
        .expect("enroll");
    let second = repo
        .ensure_enrollment(&user, id, fixed_now() + Duration::days(1))
        .await
        .expect("enroll again");

    assert_eq!(first.enrolled_at, second.enrolled_at);
    assert!(repo.is_enrolled(&user, id).await.unwrap());
    assert_eq!(repo.enrollments_for_user(&user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn chat_cursor_returns_only_newer_messages() {
    let repo = connect("memdb_chat").await;
    let user = UserId::new("user_1");

    let mut last = None;
    for (sender, body) in [
        (Sender::Student, "Em chưa thấy khoá học ạ"),
        (Sender::Support, "Em kiểm tra giúp anh mã đơn nhé"),
        (Sender::Student, "Dạ, mã là HM-1234"),
    ] {
        last = Some(
            repo.insert_message(NewMessageRecord {
                user_id: user.clone(),
                sender,
                body: body.into(),
                sent_at: fixed_now(),
            })
            .await
            .expect("insert message"),
        );
    }

    let all = repo.messages_after(&user, None, 50).await.expect("poll");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].sender, Sender::Student);

    let after_second = repo
        .messages_after(&user, Some(all[1].id), 50)
        .await
        .expect("poll");
    assert_eq!(after_second.len(), 1);
    assert_eq!(Some(after_second[0].id), last);

    let conversations = repo.conversations(10).await.expect("conversations");
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].last_body, "Dạ, mã là HM-1234");
}
