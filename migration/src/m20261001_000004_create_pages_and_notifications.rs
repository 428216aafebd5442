use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let create_pages_sql = r#"
            CREATE TABLE IF NOT EXISTS transcript_attach.pages (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title VARCHAR(255) NOT NULL,
                video_id VARCHAR(11),
                transcription_id UUID
                    REFERENCES transcript_attach.transcriptions(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_pages_sql)
            .await?;

        let create_notifications_sql = r#"
            CREATE TABLE IF NOT EXISTS transcript_attach.notifications (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                recipient_id UUID NOT NULL
                    REFERENCES transcript_attach.users(id) ON DELETE CASCADE,
                actor_id UUID NOT NULL
                    REFERENCES transcript_attach.users(id) ON DELETE CASCADE,
                verb VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                unread BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_notifications_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_notifications_recipient_unread
                 ON transcript_attach.notifications(recipient_id, unread)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS transcript_attach.notifications")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS transcript_attach.pages")
            .await?;

        Ok(())
    }
}
