use super::*;
use serde::Deserialize;

/// Move holdings between two schemes of the same fund house
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchRequest {
    pub client_id: String,
    pub from_scheme_code: String,
    pub to_scheme_code: String,
    pub folio_number: String,
    #[serde(default)]
    pub all_units: bool,
    pub units: Option<f64>,
    pub amount: Option<f64>,
    #[serde(default)]
    pub buy_sell_type: BuySellType,
    pub remarks: Option<String>,
}

impl OrderRequest for SwitchRequest {
    fn order_type(&self) -> OrderType {
        OrderType::Switch
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn validate(&self, _today: NaiveDate) -> Result<(), GatewayError> {
        require_text("clientId", &self.client_id)?;
        require_text("fromSchemeCode", &self.from_scheme_code)?;
        require_text("toSchemeCode", &self.to_scheme_code)?;
        if self.from_scheme_code == self.to_scheme_code {
            return Err(GatewayError::Validation(
                "fromSchemeCode and toSchemeCode must differ".to_string(),
            ));
        }
        require_text("folioNumber", &self.folio_number)?;
        optional_text("remarks", self.remarks.as_ref())?;
        exactly_one_quantity(self.all_units, self.units, self.amount)
    }

    fn draft(&self) -> NewOrder {
        let mut order = NewOrder::draft(OrderType::Switch, &self.client_id, &self.from_scheme_code, "SO");
        order.buy_sell_type = Some(self.buy_sell_type.as_str().to_string());
        order.to_scheme_code = Some(self.to_scheme_code.clone());
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
            self.from_scheme_code.clone(),
            self.to_scheme_code.clone(),
            "SO".to_string(),
            self.buy_sell_type.as_str().to_string(),
            DP_TXN_MODE_PHYSICAL.to_string(),
            number_field(self.amount),
            number_field(self.units),
            yes_no(self.all_units).to_string(),
            self.folio_number.clone(),
            text_field(self.remarks.as_ref()),
            KYC_COMPLIANT.to_string(),
            String::new(),
            text_field(ctx.identity.euin.as_ref()),
            ctx.identity.euin_flag().to_string(),
            "N".to_string(),
            String::new(),
            ctx.token.to_string(),
            String::new(),
            String::new(),
            String::new(),
        ])
    }
}
