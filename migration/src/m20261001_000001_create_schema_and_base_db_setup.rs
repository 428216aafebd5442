use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the service's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS transcript_attach;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO transcript_attach, public;")
            .await?;

        // Grant the application DB user access to everything created in the schema
        manager
            .get_connection()
            .execute_unprepared(r#"
                DO $$ BEGIN
                    GRANT ALL ON SCHEMA transcript_attach TO transcript;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA transcript_attach GRANT ALL ON TABLES TO transcript;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA transcript_attach GRANT ALL ON SEQUENCES TO transcript;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA transcript_attach GRANT ALL ON FUNCTIONS TO transcript;
                END $$;
            "#)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA transcript_attach REVOKE ALL ON FUNCTIONS FROM transcript;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA transcript_attach REVOKE ALL ON SEQUENCES FROM transcript;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA transcript_attach REVOKE ALL ON TABLES FROM transcript;
                    REVOKE ALL ON SCHEMA transcript_attach FROM transcript;
                END $$;
            "#)
            .await?;

        // CASCADE removes every object in the schema
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS transcript_attach CASCADE;")
            .await?;

        Ok(())
    }
}
