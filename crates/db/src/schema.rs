use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        username VARCHAR(50) NOT NULL UNIQUE,
        name VARCHAR(50) NOT NULL,
        email VARCHAR(255) NULL UNIQUE,
        role VARCHAR(16) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        phone VARCHAR(32) NULL,
        whatsapp VARCHAR(32) NULL,
        telegram VARCHAR(64) NULL,
        notes TEXT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT valid_role CHECK (role IN ('ADMIN', 'MODERATOR', 'TUTOR', 'STUDENT'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name VARCHAR(100) NOT NULL,
        description TEXT NULL,
        tutor_id UUID NOT NULL REFERENCES users(id),
        status VARCHAR(16) NOT NULL DEFAULT 'ACTIVE',
        schedule_days JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT valid_group_status CHECK (status IN ('ACTIVE', 'INACTIVE', 'COMPLETED'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_students (
        group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
        student_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        added_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        PRIMARY KEY (group_id, student_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        group_id UUID NOT NULL REFERENCES groups(id),
        date DATE NOT NULL,
        time VARCHAR(5) NOT NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'SCHEDULED',
        notes TEXT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT one_session_per_day UNIQUE (group_id, date),
        CONSTRAINT valid_session_status CHECK (status IN ('SCHEDULED', 'COMPLETED', 'CANCELED'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_records (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        session_id UUID NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        student_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        status VARCHAR(16) NOT NULL,
        notes TEXT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT one_record_per_student UNIQUE (session_id, student_id),
        CONSTRAINT valid_attendance_status CHECK (status IN ('ATTENDED', 'MISSED', 'EXCUSED'))
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);",
    "CREATE INDEX IF NOT EXISTS idx_groups_tutor_id ON groups(tutor_id);",
    "CREATE INDEX IF NOT EXISTS idx_groups_status ON groups(status);",
    "CREATE INDEX IF NOT EXISTS idx_group_students_student_id ON group_students(student_id);",
    "CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);",
    "CREATE INDEX IF NOT EXISTS idx_attendance_records_student_id ON attendance_records(student_id);",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
