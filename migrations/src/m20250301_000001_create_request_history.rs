use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RequestHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequestHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RequestHistory::Method)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestHistory::Url).text().not_null())
                    .col(ColumnDef::new(RequestHistory::Headers).json().not_null())
                    .col(ColumnDef::new(RequestHistory::Body).text().null())
                    .col(ColumnDef::new(RequestHistory::Response).text().not_null())
                    .col(ColumnDef::new(RequestHistory::Status).integer().not_null())
                    .col(
                        ColumnDef::new(RequestHistory::ResponseTime)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_history_created_at")
                    .table(RequestHistory::Table)
                    .col(RequestHistory::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Serves the method/status filters of the history list
        manager
            .create_index(
                Index::create()
                    .name("idx_request_history_method_status")
                    .table(RequestHistory::Table)
                    .col(RequestHistory::Method)
                    .col(RequestHistory::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        log::info!("Created request_history table with created_at and method/status indexes");

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RequestHistory {
    Table,
    Id,
    Method,
    Url,
    Headers,
    Body,
    Response,
    Status,
    ResponseTime,
    CreatedAt,
}
