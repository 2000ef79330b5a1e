use super::*;
use serde::Deserialize;

/// Purchase into a liquid scheme paired with a dated redemption
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadRequest {
    pub client_id: String,
    pub scheme_code: String,
    pub purchase_amount: f64,
    pub redemption_amount: Option<f64>,
    #[serde(default)]
    pub all_units: bool,
    pub redeem_date: NaiveDate,
    pub folio_number: Option<String>,
    #[serde(default)]
    pub buy_sell_type: BuySellType,
    pub remarks: Option<String>,
}

impl OrderRequest for SpreadRequest {
    fn order_type(&self) -> OrderType {
        OrderType::Spread
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn validate(&self, today: NaiveDate) -> Result<(), GatewayError> {
        require_text("clientId", &self.client_id)?;
        require_text("schemeCode", &self.scheme_code)?;
        require_positive("purchaseAmount", self.purchase_amount)?;
        optional_positive("redemptionAmount", self.redemption_amount)?;
        if self.all_units && self.redemption_amount.is_some() {
            return Err(GatewayError::Validation(
                "Specify only one of allUnits or redemptionAmount".to_string(),
            ));
        }
        if self.redeem_date < today {
            return Err(GatewayError::Validation(format!(
                "redeemDate {} is in the past",
                self.redeem_date
            )));
        }
        optional_text("folioNumber", self.folio_number.as_ref())?;
        optional_text("remarks", self.remarks.as_ref())
    }

    fn draft(&self) -> NewOrder {
        let mut order = NewOrder::draft(OrderType::Spread, &self.client_id, &self.scheme_code, "P");
        order.buy_sell_type = Some(self.buy_sell_type.as_str().to_string());
        order.amount = Some(self.purchase_amount);
        order.redemption_amount = self.redemption_amount;
        order.all_units = self.all_units;
        order.redeem_date = Some(self.redeem_date);
        order.folio_number = self.folio_number.clone();
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
            "P".to_string(),
            self.buy_sell_type.as_str().to_string(),
            DP_TXN_MODE_PHYSICAL.to_string(),
            number_field(Some(self.purchase_amount)),
            number_field(self.redemption_amount),
            yes_no(self.all_units).to_string(),
            self.redeem_date.format("%d/%m/%Y").to_string(),
            text_field(self.folio_number.as_ref()),
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

#[cfg(test)]
mod tests {
    use super::test_support::{identity, today};
    use super::*;

    fn request() -> SpreadRequest {
        SpreadRequest {
            client_id: "C1".to_string(),
            scheme_code: "LIQ1".to_string(),
            purchase_amount: 100000.0,
            redemption_amount: Some(50000.0),
            all_units: false,
            redeem_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            folio_number: None,
            buy_sell_type: BuySellType::Fresh,
            remarks: None,
        }
    }

    #[test]
    fn test_redeem_date_not_in_past() {
        assert!(request().validate(today()).is_ok());

        let mut req = request();
        req.redeem_date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert!(req.validate(today()).is_err());

        req.redeem_date = today();
        assert!(req.validate(today()).is_ok());
    }

    #[test]
    fn test_all_units_excludes_redemption_amount() {
        let mut req = request();
        req.all_units = true;
        assert!(req.validate(today()).is_err());

        req.redemption_amount = None;
        assert!(req.validate(today()).is_ok());
    }

    #[test]
    fn test_draft_keeps_both_legs() {
        let draft = request().draft();
        assert_eq!(draft.amount, Some(100000.0));
        assert_eq!(draft.redemption_amount, Some(50000.0));
        assert_eq!(draft.redeem_date, NaiveDate::from_ymd_opt(2024, 6, 3));
    }

    #[test]
    fn test_wire_layout() {
        let identity = identity(None);
        let fields = request().wire_fields(&WireContext {
            reference_number: "REF1",
            identity: &identity,
            token: "tok",
        });

        assert_eq!(fields.len(), 27);
        assert_eq!(fields[9], "100000");
        assert_eq!(fields[10], "50000");
        assert_eq!(fields[12], "03/06/2024");
        assert_eq!(fields[23], "tok");
    }
}
