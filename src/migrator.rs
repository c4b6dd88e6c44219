use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_sites_table::Migration),
            Box::new(m20240601_000002_create_expenses_table::Migration),
            Box::new(m20240601_000003_create_advances_table::Migration),
            Box::new(m20240601_000004_create_funds_received_table::Migration),
            Box::new(m20240601_000005_create_site_invoices_table::Migration),
        ]
    }
}

/// Identifiers of the `sites` table shared by the child-table migrations.
#[derive(DeriveIden)]
enum Sites {
    Table,
    Id,
    Name,
    Location,
    Status,
    Funds,
    SupervisorId,
    StartDate,
    Remarks,
    CreatedAt,
    CreatedBy,
}

fn site_fk(
    name: &str,
    table: impl IntoIden + 'static,
    column: impl IntoIden + 'static,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Sites::Table, Sites::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

fn money(col: impl IntoIden + 'static) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(16, 2)
        .not_null()
        .default(0)
        .to_owned()
}

mod m20240601_000001_create_sites_table {
    use super::Sites;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_sites_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sites::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sites::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sites::Name).string().not_null())
                        .col(ColumnDef::new(Sites::Location).string().not_null())
                        .col(
                            ColumnDef::new(Sites::Status)
                                .string_len(20)
                                .not_null()
                                .default("active"),
                        )
                        .col(super::money(Sites::Funds))
                        .col(ColumnDef::new(Sites::SupervisorId).uuid().null())
                        .col(ColumnDef::new(Sites::StartDate).date().null())
                        .col(ColumnDef::new(Sites::Remarks).text().null())
                        .col(
                            ColumnDef::new(Sites::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Sites::CreatedBy).uuid().not_null())
                        .to_owned(),
                )
                .await?;

            // duplicate names surface as a unique violation on this index
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sites_name_unique")
                        .table(Sites::Table)
                        .col(Sites::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sites_supervisor_id")
                        .table(Sites::Table)
                        .col(Sites::SupervisorId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sites::Table).to_owned())
                .await
        }
    }
}

mod m20240601_000002_create_expenses_table {
    use super::{money, site_fk};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_expenses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Expenses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Expenses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Expenses::SiteId).uuid().not_null())
                        .col(ColumnDef::new(Expenses::Category).string().not_null())
                        .col(ColumnDef::new(Expenses::Description).text().null())
                        .col(money(Expenses::Amount))
                        .col(ColumnDef::new(Expenses::ExpenseDate).date().not_null())
                        .col(ColumnDef::new(Expenses::Remarks).text().null())
                        .col(
                            ColumnDef::new(Expenses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Expenses::CreatedBy).uuid().not_null())
                        .foreign_key(&mut site_fk(
                            "fk_expenses_site_id",
                            Expenses::Table,
                            Expenses::SiteId,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_expenses_site_id")
                        .table(Expenses::Table)
                        .col(Expenses::SiteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Expenses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Expenses {
        Table,
        Id,
        SiteId,
        Category,
        Description,
        Amount,
        ExpenseDate,
        Remarks,
        CreatedAt,
        CreatedBy,
    }
}

mod m20240601_000003_create_advances_table {
    use super::{money, site_fk};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_advances_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Advances::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Advances::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Advances::SiteId).uuid().not_null())
                        .col(
                            ColumnDef::new(Advances::RecipientType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Advances::RecipientName).string().not_null())
                        .col(money(Advances::Amount))
                        // free-form code, new purposes need no migration
                        .col(
                            ColumnDef::new(Advances::Purpose)
                                .string_len(50)
                                .not_null()
                                .default("ADVANCE"),
                        )
                        .col(ColumnDef::new(Advances::AdvanceDate).date().not_null())
                        .col(ColumnDef::new(Advances::Remarks).text().null())
                        .col(
                            ColumnDef::new(Advances::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Advances::CreatedBy).uuid().not_null())
                        .foreign_key(&mut site_fk(
                            "fk_advances_site_id",
                            Advances::Table,
                            Advances::SiteId,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_advances_site_id")
                        .table(Advances::Table)
                        .col(Advances::SiteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Advances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Advances {
        Table,
        Id,
        SiteId,
        RecipientType,
        RecipientName,
        Amount,
        Purpose,
        AdvanceDate,
        Remarks,
        CreatedAt,
        CreatedBy,
    }
}

mod m20240601_000004_create_funds_received_table {
    use super::{money, site_fk};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_funds_received_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FundsReceived::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FundsReceived::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FundsReceived::SiteId).uuid().not_null())
                        .col(money(FundsReceived::Amount))
                        .col(
                            ColumnDef::new(FundsReceived::ReceivedDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FundsReceived::Method).string().null())
                        .col(ColumnDef::new(FundsReceived::Reference).string().null())
                        .col(ColumnDef::new(FundsReceived::Remarks).text().null())
                        .col(
                            ColumnDef::new(FundsReceived::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FundsReceived::CreatedBy).uuid().not_null())
                        .foreign_key(&mut site_fk(
                            "fk_funds_received_site_id",
                            FundsReceived::Table,
                            FundsReceived::SiteId,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_funds_received_site_id")
                        .table(FundsReceived::Table)
                        .col(FundsReceived::SiteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FundsReceived::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FundsReceived {
        Table,
        Id,
        SiteId,
        Amount,
        ReceivedDate,
        Method,
        Reference,
        Remarks,
        CreatedAt,
        CreatedBy,
    }
}

mod m20240601_000005_create_site_invoices_table {
    use super::{money, site_fk};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_site_invoices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SiteInvoices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SiteInvoices::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SiteInvoices::SiteId).uuid().not_null())
                        .col(ColumnDef::new(SiteInvoices::VendorName).string().not_null())
                        .col(
                            ColumnDef::new(SiteInvoices::InvoiceNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SiteInvoices::InvoiceDate).date().not_null())
                        .col(money(SiteInvoices::NetAmount))
                        .col(
                            ColumnDef::new(SiteInvoices::PaymentBy)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SiteInvoices::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(SiteInvoices::Remarks).text().null())
                        .col(
                            ColumnDef::new(SiteInvoices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SiteInvoices::CreatedBy).uuid().not_null())
                        .foreign_key(&mut site_fk(
                            "fk_site_invoices_site_id",
                            SiteInvoices::Table,
                            SiteInvoices::SiteId,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_site_invoices_site_id")
                        .table(SiteInvoices::Table)
                        .col(SiteInvoices::SiteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SiteInvoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SiteInvoices {
        Table,
        Id,
        SiteId,
        VendorName,
        InvoiceNumber,
        InvoiceDate,
        NetAmount,
        PaymentBy,
        Status,
        Remarks,
        CreatedAt,
        CreatedBy,
    }
}
