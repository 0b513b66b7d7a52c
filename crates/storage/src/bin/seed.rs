//! Seeds a development database with a demo course, a batch of redemption
//! codes, and a short support conversation.
//!
//! Usage:
//!   cargo run -p storage --bin seed -- [--db <sqlite_url>] [--codes <n>]

use std::fmt;

use chrono::Utc;
use havamath_core::model::{
    CourseDraft, LessonDraft, LessonDraftKind, ModuleDraft, QuestionDraft, QuestionKind,
    QuizDraft, Sender, UserId, VideoDraft,
};
use storage::repository::{
    ChatRepository as _, CourseRepository as _, NewCodeRecord, NewMessageRecord,
    RedemptionCodeRepository as _, Storage,
};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    codes: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCodes { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCodes { raw } => write!(f, "invalid --codes value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, ArgsError> {
    let mut db_url = "sqlite://dev.sqlite3".to_string();
    let mut codes = 10_u32;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = args.next().ok_or(ArgsError::MissingValue { flag: "--db" })?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                db_url = value;
            }
            "--codes" => {
                let value = args
                    .next()
                    .ok_or(ArgsError::MissingValue { flag: "--codes" })?;
                codes = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidCodes { raw: value.clone() })?;
            }
            other => return Err(ArgsError::UnknownArg(other.to_string())),
        }
    }

    Ok(Args { db_url, codes })
}

fn demo_course() -> CourseDraft {
    CourseDraft {
        title: "Toán 12 – Luyện thi THPT quốc gia".into(),
        description: Some("Lộ trình ôn tập theo chuyên đề kèm bài kiểm tra.".into()),
        category: "Toán".into(),
        author: "Thầy Hà".into(),
        price_vnd: 599_000,
        modules: vec![
            ModuleDraft {
                title: "Chương 1: Hàm số".into(),
                lessons: vec![
                    LessonDraft {
                        title: "Bài giảng: Khảo sát hàm số".into(),
                        kind: LessonDraftKind::Video(VideoDraft {
                            url: "https://videos.havamath.vn/toan12/ham-so.mp4".into(),
                            notes: Some("Xem trước bảng biến thiên.".into()),
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
                                        choices: vec![
                                            "21".into(),
                                            "22".into(),
                                            "23".into(),
                                            "24".into(),
                                        ],
                                        correct: "22".into(),
                                    },
                                },
                                QuestionDraft {
                                    points: 1,
                                    kind: QuestionKind::FillInBlank { answer: "96".into() },
                                },
                                QuestionDraft {
                                    points: 2,
                                    kind: QuestionKind::MultipleChoice {
                                        choices: vec![
                                            "x = 1".into(),
                                            "x = 2".into(),
                                            "x = 3".into(),
                                        ],
                                        correct: vec!["x = 1".into(), "x = 3".into()],
                                    },
                                },
                            ],
                            passing_score: 70,
                            time_limit_secs: Some(900),
                        }),
                    },
                ],
            },
            ModuleDraft {
                title: "Chương 2: Mũ và logarit".into(),
                lessons: vec![LessonDraft {
                    title: "Bài giảng: Phương trình mũ".into(),
                    kind: LessonDraftKind::Video(VideoDraft {
                        url: "https://videos.havamath.vn/toan12/phuong-trinh-mu.mp4".into(),
                        notes: None,
                        attachments: vec![],
                    }),
                }],
            },
        ],
    }
}

/// Deterministic seed codes; real issuance uses the redemption service's
/// CSPRNG path.
fn seed_codes(count: u32, admin: &UserId) -> Vec<NewCodeRecord> {
    let now = Utc::now();
    (0..count)
        .map(|i| NewCodeRecord {
            code: format!("HAVASEED{i:02}"),
            created_by: admin.clone(),
            created_at: now,
            expires_at: None,
        })
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = Utc::now();
    let admin = UserId::new("admin_seed");

    let course = demo_course().validate(now)?;
    let course_id = storage.courses.insert_course(&course).await?;
    println!("seeded course {course_id}");

    let codes = seed_codes(args.codes.min(100), &admin);
    match storage.codes.insert_codes(&codes).await {
        Ok(ids) => println!("seeded {} redemption codes", ids.len()),
        // Re-running against the same database is fine; codes stay as-is.
        Err(storage::repository::StorageError::Conflict) => {
            println!("seed codes already present, skipping");
        }
        Err(e) => return Err(e.into()),
    }

    let student = UserId::new("user_demo");
    for (sender, body) in [
        (Sender::Student, "Em đã chuyển khoản mà chưa thấy mở khoá ạ"),
        (Sender::Support, "Em kiểm tra giúp anh mã giao dịch nhé"),
    ] {
        storage
            .chat
            .insert_message(NewMessageRecord {
                user_id: student.clone(),
                sender,
                body: body.into(),
                sent_at: now,
            })
            .await?;
    }
    println!("seeded demo conversation for {student}");

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
