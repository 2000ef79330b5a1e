use super::*;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub client_id: String,
    pub scheme_code: String,
    pub amount: f64,
    #[serde(default)]
    pub buy_sell_type: BuySellType,
    /// Existing folio for additional purchases
    pub folio_number: Option<String>,
    pub remarks: Option<String>,
}

impl OrderRequest for PurchaseRequest {
    fn order_type(&self) -> OrderType {
        OrderType::Purchase
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn validate(&self, _today: NaiveDate) -> Result<(), GatewayError> {
        require_text("clientId", &self.client_id)?;
        require_text("schemeCode", &self.scheme_code)?;
        require_positive("amount", self.amount)?;
        optional_text("folioNumber", self.folio_number.as_ref())?;
        optional_text("remarks", self.remarks.as_ref())
    }

    fn draft(&self) -> NewOrder {
        let mut order = NewOrder::draft(OrderType::Purchase, &self.client_id, &self.scheme_code, "P");
        order.buy_sell_type = Some(self.buy_sell_type.as_str().to_string());
        order.amount = Some(self.amount);
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
            number_field(Some(self.amount)),
            String::new(),
            "N".to_string(),
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

    fn request() -> PurchaseRequest {
        PurchaseRequest {
            client_id: "C1".to_string(),
            scheme_code: "S1".to_string(),
            amount: 5000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(request().validate(today()).is_ok());

        let mut req = request();
        req.amount = 0.0;
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn test_remarks_cannot_break_layout() {
        let mut req = request();
        req.remarks = Some("sip|top-up".to_string());
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn test_deserializes_camel_case_with_defaults() {
        let req: PurchaseRequest =
            serde_json::from_str(r#"{"clientId":"C1","schemeCode":"S1","amount":1000}"#).unwrap();
        assert_eq!(req.buy_sell_type, BuySellType::Fresh);
        assert_eq!(req.amount, 1000.0);

        let req: PurchaseRequest = serde_json::from_str(
            r#"{"clientId":"C1","schemeCode":"S1","amount":1000,"buySellType":"ADDITIONAL"}"#,
        )
        .unwrap();
        assert_eq!(req.buy_sell_type, BuySellType::Additional);
    }

    #[test]
    fn test_wire_layout() {
        let identity = identity(None);
        let fields = request().wire_fields(&WireContext {
            reference_number: "REF1",
            identity: &identity,
            token: "tok",
        });

        assert_eq!(fields.len(), 26);
        assert_eq!(fields[6], "P");
        assert_eq!(fields[7], "FRESH");
        assert_eq!(fields[9], "5000");
        assert_eq!(fields[11], "N");
        assert_eq!(fields[18], "N");
        assert_eq!(fields[22], "tok");
    }
}
