use havamath_core::model::{
    Attachment, Course, CourseId, Lesson, LessonKind, Module, Question, QuizLesson,
    ValidatedCourse, ValidatedLessonKind, VideoLesson,
};
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use url::Url;

use super::SqliteRepository;
use super::mapping::{
    conn, course_id_from_i64, lesson_id_from_i64, module_id_from_i64, question_body_from_json,
    question_body_to_json, question_id_from_i64, ser, to_i64,
};
use crate::repository::{CourseRepository, StorageError};

/// Storage shape of one attachment inside the `attachments` JSON column.
#[derive(Serialize, Deserialize)]
struct AttachmentRow {
    name: String,
    url: String,
}

fn attachments_to_json(attachments: &[Attachment]) -> Result<String, StorageError> {
    let rows: Vec<AttachmentRow> = attachments
        .iter()
        .map(|a| AttachmentRow {
            name: a.name.clone(),
            url: a.url.to_string(),
        })
        .collect();
    serde_json::to_string(&rows).map_err(ser)
}

fn attachments_from_json(raw: &str) -> Result<Vec<Attachment>, StorageError> {
    let rows: Vec<AttachmentRow> = serde_json::from_str(raw).map_err(ser)?;
    rows.into_iter()
        .map(|row| {
            Ok(Attachment {
                name: row.name,
                url: Url::parse(&row.url).map_err(ser)?,
            })
        })
        .collect()
}

async fn insert_tree(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    course: &ValidatedCourse,
) -> Result<(), StorageError> {
    for (module_pos, module) in course.modules.iter().enumerate() {
        let module_id = sqlx::query(
            r"
            INSERT INTO modules (course_id, position, title)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(course_id)
        .bind(module_pos as i64)
        .bind(&module.title)
        .execute(&mut **tx)
        .await
        .map_err(conn)?
        .last_insert_rowid();

        for (lesson_pos, lesson) in module.lessons.iter().enumerate() {
            let (kind, video_url, video_notes, attachments, passing_score, time_limit) =
                match &lesson.kind {
                    ValidatedLessonKind::Video(video) => (
                        "video",
                        Some(video.url.to_string()),
                        video.notes.clone(),
                        Some(attachments_to_json(&video.attachments)?),
                        None,
                        None,
                    ),
                    ValidatedLessonKind::Quiz(quiz) => (
                        "quiz",
                        None,
                        None,
                        None,
                        Some(i64::from(quiz.passing_score)),
                        quiz.time_limit_secs.map(i64::from),
                    ),
                };

            let lesson_id = sqlx::query(
                r"
                INSERT INTO lessons
                    (module_id, position, title, kind, video_url, video_notes,
                     attachments, passing_score, time_limit_secs)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(module_id)
            .bind(lesson_pos as i64)
            .bind(&lesson.title)
            .bind(kind)
            .bind(video_url)
            .bind(video_notes)
            .bind(attachments)
            .bind(passing_score)
            .bind(time_limit)
            .execute(&mut **tx)
            .await
            .map_err(conn)?
            .last_insert_rowid();

            if let ValidatedLessonKind::Quiz(quiz) = &lesson.kind {
                for (question_pos, question) in quiz.questions.iter().enumerate() {
                    sqlx::query(
                        r"
                        INSERT INTO questions (lesson_id, position, points, body)
                        VALUES (?1, ?2, ?3, ?4)
                        ",
                    )
                    .bind(lesson_id)
                    .bind(question_pos as i64)
                    .bind(i64::from(question.points))
                    .bind(question_body_to_json(&question.kind)?)
                    .execute(&mut **tx)
                    .await
                    .map_err(conn)?;
                }
            }
        }
    }
    Ok(())
}

async fn load_course(pool: &SqlitePool, id: i64) -> Result<Option<Course>, StorageError> {
    let Some(course_row) = sqlx::query(
        r"
        SELECT id, title, description, category, author, price_vnd, created_at
        FROM courses WHERE id = ?1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(conn)?
    else {
        return Ok(None);
    };

    let module_rows = sqlx::query(
        r"
        SELECT id, title FROM modules
        WHERE course_id = ?1
        ORDER BY position ASC
        ",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(conn)?;

    let mut modules = Vec::with_capacity(module_rows.len());
    for module_row in &module_rows {
        let module_id: i64 = module_row.try_get("id").map_err(ser)?;
        let lesson_rows = sqlx::query(
            r"
            SELECT id, title, kind, video_url, video_notes, attachments,
                   passing_score, time_limit_secs
            FROM lessons
            WHERE module_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(module_id)
        .fetch_all(pool)
        .await
        .map_err(conn)?;

        let mut lessons = Vec::with_capacity(lesson_rows.len());
        for lesson_row in &lesson_rows {
            let lesson_id: i64 = lesson_row.try_get("id").map_err(ser)?;
            let kind_tag: String = lesson_row.try_get("kind").map_err(ser)?;
            let kind = match kind_tag.as_str() {
                "video" => {
                    let raw_url: String = lesson_row.try_get("video_url").map_err(ser)?;
                    LessonKind::Video(VideoLesson {
                        url: Url::parse(&raw_url).map_err(ser)?,
                        notes: lesson_row.try_get("video_notes").map_err(ser)?,
                        attachments: attachments_from_json(
                            &lesson_row
                                .try_get::<Option<String>, _>("attachments")
                                .map_err(ser)?
                                .unwrap_or_else(|| "[]".to_string()),
                        )?,
                    })
                }
                "quiz" => {
                    let question_rows = sqlx::query(
                        r"
                        SELECT id, points, body FROM questions
                        WHERE lesson_id = ?1
                        ORDER BY position ASC
                        ",
                    )
                    .bind(lesson_id)
                    .fetch_all(pool)
                    .await
                    .map_err(conn)?;

                    let mut questions = Vec::with_capacity(question_rows.len());
                    for question_row in &question_rows {
                        let points_i64: i64 = question_row.try_get("points").map_err(ser)?;
                        questions.push(Question {
                            id: question_id_from_i64(
                                question_row.try_get::<i64, _>("id").map_err(ser)?,
                            )?,
                            points: u32::try_from(points_i64).map_err(|_| {
                                StorageError::Serialization(format!(
                                    "invalid points: {points_i64}"
                                ))
                            })?,
                            kind: question_body_from_json(
                                &question_row.try_get::<String, _>("body").map_err(ser)?,
                            )?,
                        });
                    }

                    let passing_i64: i64 = lesson_row.try_get("passing_score").map_err(ser)?;
                    LessonKind::Quiz(QuizLesson {
                        questions,
                        passing_score: u8::try_from(passing_i64).map_err(|_| {
                            StorageError::Serialization(format!(
                                "invalid passing_score: {passing_i64}"
                            ))
                        })?,
                        time_limit_secs: lesson_row
                            .try_get::<Option<i64>, _>("time_limit_secs")
                            .map_err(ser)?
                            .map(|v| {
                                u32::try_from(v).map_err(|_| {
                                    StorageError::Serialization(format!(
                                        "invalid time_limit_secs: {v}"
                                    ))
                                })
                            })
                            .transpose()?,
                    })
                }
                other => {
                    return Err(StorageError::Serialization(format!(
                        "invalid lesson kind: {other}"
                    )));
                }
            };

            lessons.push(Lesson {
                id: lesson_id_from_i64(lesson_id)?,
                title: lesson_row.try_get("title").map_err(ser)?,
                kind,
            });
        }

        modules.push(Module {
            id: module_id_from_i64(module_id)?,
            title: module_row.try_get("title").map_err(ser)?,
            lessons,
        });
    }

    let price_i64: i64 = course_row.try_get("price_vnd").map_err(ser)?;
    Ok(Some(Course {
        id: course_id_from_i64(course_row.try_get::<i64, _>("id").map_err(ser)?)?,
        title: course_row.try_get("title").map_err(ser)?,
        description: course_row.try_get("description").map_err(ser)?,
        category: course_row.try_get("category").map_err(ser)?,
        author: course_row.try_get("author").map_err(ser)?,
        price_vnd: u64::try_from(price_i64)
            .map_err(|_| StorageError::Serialization(format!("invalid price: {price_i64}")))?,
        modules,
        created_at: course_row.try_get("created_at").map_err(ser)?,
    }))
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert_course(&self, course: &ValidatedCourse) -> Result<CourseId, StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        let course_id = sqlx::query(
            r"
            INSERT INTO courses (title, description, category, author, price_vnd, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.category)
        .bind(&course.author)
        .bind(to_i64("price_vnd", course.price_vnd)?)
        .bind(course.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .last_insert_rowid();

        insert_tree(&mut tx, course_id, course).await?;
        tx.commit().await.map_err(conn)?;
        course_id_from_i64(course_id)
    }

    async fn replace_course(
        &self,
        id: CourseId,
        course: &ValidatedCourse,
    ) -> Result<(), StorageError> {
        let course_id = to_i64("course_id", id.value())?;
        let mut tx = self.pool().begin().await.map_err(conn)?;

        // created_at is preserved; everything else is replaced.
        let updated = sqlx::query(
            r"
            UPDATE courses
            SET title = ?2, description = ?3, category = ?4, author = ?5, price_vnd = ?6
            WHERE id = ?1
            ",
        )
        .bind(course_id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.category)
        .bind(&course.author)
        .bind(to_i64("price_vnd", course.price_vnd)?)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        // ON DELETE CASCADE clears lessons and questions with the modules.
        sqlx::query("DELETE FROM modules WHERE course_id = ?1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        insert_tree(&mut tx, course_id, course).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        load_course(self.pool(), to_i64("course_id", id.value())?).await
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query("SELECT id FROM courses ORDER BY id ASC LIMIT ?1")
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            if let Some(course) = load_course(self.pool(), id).await? {
                courses.push(course);
            }
        }
        Ok(courses)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let deleted = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(to_i64("course_id", id.value())?)
            .execute(self.pool())
            .await
            .map_err(conn)?;
        if deleted.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
