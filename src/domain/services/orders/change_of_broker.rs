use super::*;
use serde::Deserialize;

/// Transfer an existing holding's distributor of record to the advisor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOfBrokerRequest {
    pub client_id: String,
    pub scheme_code: String,
    pub folio_number: String,
    #[serde(default)]
    pub all_units: bool,
    pub units: Option<f64>,
    /// ARN of the distributor the holding moves away from
    pub from_arn: Option<String>,
    pub remarks: Option<String>,
}

impl OrderRequest for ChangeOfBrokerRequest {
    fn order_type(&self) -> OrderType {
        OrderType::ChangeOfBroker
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn validate(&self, _today: NaiveDate) -> Result<(), GatewayError> {
        require_text("clientId", &self.client_id)?;
        require_text("schemeCode", &self.scheme_code)?;
        require_text("folioNumber", &self.folio_number)?;
        optional_text("fromArn", self.from_arn.as_ref())?;
        optional_text("remarks", self.remarks.as_ref())?;
        exactly_one_quantity(self.all_units, self.units, None)
    }

    fn draft(&self) -> NewOrder {
        let mut order = NewOrder::draft(OrderType::ChangeOfBroker, &self.client_id, &self.scheme_code, "P");
        order.folio_number = Some(self.folio_number.clone());
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
            self.folio_number.clone(),
            yes_no(self.all_units).to_string(),
            number_field(self.units),
            text_field(self.from_arn.as_ref()),
            text_field(self.remarks.as_ref()),
            String::new(),
            text_field(ctx.identity.euin.as_ref()),
            ctx.identity.euin_flag().to_string(),
            String::new(),
            ctx.token.to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{identity, today};
    use super::*;

    fn request() -> ChangeOfBrokerRequest {
        ChangeOfBrokerRequest {
            client_id: "C1".to_string(),
            scheme_code: "S1".to_string(),
            folio_number: "F1".to_string(),
            all_units: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_all_units_or_units() {
        let mut req = request();
        req.all_units = false;
        assert!(matches!(req.validate(today()), Err(GatewayError::Validation(_))));

        req.units = Some(25.5);
        assert!(req.validate(today()).is_ok());

        req.all_units = true;
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn test_folio_required() {
        let mut req = request();
        req.folio_number = String::new();
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn test_draft_defaults() {
        let draft = request().draft();
        assert_eq!(draft.order_type, OrderType::ChangeOfBroker);
        assert_eq!(draft.trans_code, "NEW");
        assert_eq!(draft.buy_sell, "P");
        assert_eq!(draft.folio_number.as_deref(), Some("F1"));
        assert!(draft.all_units);
    }

    #[test]
    fn test_wire_layout() {
        let identity = identity(Some("E123456"));
        let mut req = request();
        req.from_arn = Some("ARN-9999".to_string());
        let fields = req.wire_fields(&WireContext {
            reference_number: "REF1",
            identity: &identity,
            token: "tok",
        });

        assert_eq!(
            fields.as_slice(),
            [
                "NEW", "REF1", "", "10001", "C1", "S1", "F1", "Y", "", "ARN-9999", "", "",
                "E123456", "Y", "", "tok"
            ]
        );
    }
}
