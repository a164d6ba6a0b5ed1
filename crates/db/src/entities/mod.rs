//! `SeaORM` entity definitions.

pub mod account_transactions;
pub mod accounts;
pub mod sea_orm_active_enums;

pub mod prelude {
    //! Entity re-exports.

    pub use super::account_transactions::Entity as AccountTransactions;
    pub use super::accounts::Entity as Accounts;
}
