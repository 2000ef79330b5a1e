use super::*;
use serde::Deserialize;

/// Sell units from an existing folio, by units, amount or in full
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRequest {
    pub client_id: String,
    pub scheme_code: String,
    pub folio_number: String,
    #[serde(default)]
    pub all_units: bool,
    pub units: Option<f64>,
    pub amount: Option<f64>,
    pub remarks: Option<String>,
}

impl OrderRequest for RedemptionRequest {
    fn order_type(&self) -> OrderType {
        OrderType::Redemption
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn validate(&self, _today: NaiveDate) -> Result<(), GatewayError> {
        require_text("clientId", &self.client_id)?;
        require_text("schemeCode", &self.scheme_code)?;
        require_text("folioNumber", &self.folio_number)?;
        optional_text("remarks", self.remarks.as_ref())?;
        exactly_one_quantity(self.all_units, self.units, self.amount)
    }

    fn draft(&self) -> NewOrder {
        let mut order = NewOrder::draft(OrderType::Redemption, &self.client_id, &self.scheme_code, "R");
        order.buy_sell_type = Some(BuySellType::Fresh.as_str().to_string());
        order.folio_number = Some(self.folio_number.clone());
        order.amount = self.amount;
        order.units = self.units;
        order.all_units = self.all_units;
        order.remarks = self.remarks.clone();
        order
    }

    fn wire_fields(&self, ctx: &WireContext<'_>) -> Zeroizing<Vec<String>> {
        Zeroizing::new(vec![
            "NEW".to_string(),
            ctx.reference_number.to_string(),
            String::new(),
            ctx.identity.member_id.clone(),
            self.client_id.clone(),
            self.scheme_code.clone(),
            "R".to_string(),
            BuySellType::Fresh.as_str().to_string(),
            DP_TXN_MODE_PHYSICAL.to_string(),
            number_field(self.amount),
            number_field(self.units),
            yes_no(self.all_units).to_string(),
            self.folio_number.clone(),
            text_field(self.remarks.as_ref()),
            KYC_COMPLIANT.to_string(),
            String::new(),
            String::new(),
            text_field(ctx.identity.euin.as_ref()),
            ctx.identity.euin_flag().to_string(),
            "N".to_string(),
            "N".to_string(),
            String::new(),
            ctx.token.to_string(),
            String::new(),
            String::new(),
            String::new(),
        ])
    }
}
