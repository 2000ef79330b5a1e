//! Database Models

use crate::domain::entities::order::Order;
use crate::domain::repositories::order_repository::RepositoryError;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Order row as stored
#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: String,
    pub advisor_id: String,
    pub client_id: String,
    pub member_id: String,
    pub reference_number: String,
    pub order_type: String,
    pub trans_code: String,
    pub buy_sell: String,
    pub buy_sell_type: Option<String>,
    pub scheme_code: String,
    pub to_scheme_code: Option<String>,
    pub folio_number: Option<String>,
    pub amount: Option<f64>,
    pub redemption_amount: Option<f64>,
    pub units: Option<f64>,
    pub all_units: bool,
    pub redeem_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub status: String,
    pub exchange_order_number: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRecord> for Order {
    type Error = RepositoryError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        Ok(Order {
            order_type: record.order_type.parse().map_err(RepositoryError::Storage)?,
            status: record.status.parse().map_err(RepositoryError::Storage)?,
            id: record.id,
            advisor_id: record.advisor_id,
            client_id: record.client_id,
            member_id: record.member_id,
            reference_number: record.reference_number,
            trans_code: record.trans_code,
            buy_sell: record.buy_sell,
            buy_sell_type: record.buy_sell_type,
            scheme_code: record.scheme_code,
            to_scheme_code: record.to_scheme_code,
            folio_number: record.folio_number,
            amount: record.amount,
            redemption_amount: record.redemption_amount,
            units: record.units,
            all_units: record.all_units,
            redeem_date: record.redeem_date,
            remarks: record.remarks,
            exchange_order_number: record.exchange_order_number,
            response_code: record.response_code,
            response_message: record.response_message,
            submitted_at: record.submitted_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Credential row; secret columns stay encrypted
#[derive(Debug, Clone, FromRow)]
pub struct CredentialRecord {
    pub advisor_id: String,
    pub member_id: String,
    pub user_id: String,
    pub arn: Option<String>,
    pub euin: Option<String>,
    pub password_enc: String,
    pub pass_key_enc: String,
    pub is_active: bool,
}
