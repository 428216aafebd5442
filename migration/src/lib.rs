pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_schema_and_base_db_setup;
mod m20261001_000002_create_users;
mod m20261001_000003_create_transcriptions;
mod m20261001_000004_create_pages_and_notifications;
mod m20261001_000005_add_initial_admin_user;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_schema_and_base_db_setup::Migration),
            Box::new(m20261001_000002_create_users::Migration),
            Box::new(m20261001_000003_create_transcriptions::Migration),
            Box::new(m20261001_000004_create_pages_and_notifications::Migration),
            Box::new(m20261001_000005_add_initial_admin_user::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_have_unique_names_in_order() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|migration| migration.name().to_string())
            .collect();

        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }
}
