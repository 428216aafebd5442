use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // video_id is unique: two requests racing for the same video cannot both
        // leave a pending row behind, the second insert fails instead.
        let create_transcriptions_sql = r#"
            CREATE TABLE IF NOT EXISTS transcript_attach.transcriptions (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title VARCHAR(255) NOT NULL,
                video_id VARCHAR(11),
                file VARCHAR(255),
                verified BOOLEAN NOT NULL DEFAULT FALSE,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                target_reference VARCHAR(255),
                target_field VARCHAR(255),
                requested_by UUID
                    REFERENCES transcript_attach.users(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT transcriptions_video_id_unique UNIQUE(video_id),
                CONSTRAINT transcriptions_video_id_format
                    CHECK (video_id IS NULL OR video_id ~ '^[a-zA-Z0-9_-]{11}$'),
                CONSTRAINT transcriptions_file_is_docx
                    CHECK (file IS NULL OR file LIKE '%.docx')
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_transcriptions_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_transcriptions_pending
                 ON transcript_attach.transcriptions(created_at)
                 WHERE completed = FALSE",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS transcript_attach.transcriptions")
            .await?;

        Ok(())
    }
}
