//! Transaction data returned by the payment middleware.

use serde::{Deserialize, Serialize};

use super::de::null_as_default;

/// The middleware's record of a completed charge.
///
/// This is the only authoritative evidence that money moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Charged amount, as reported by the processor.
    pub amount: String,
    /// Billing details the processor holds for the payer.
    #[serde(default, deserialize_with = "null_as_default")]
    pub billing_details: BillingDetails,
    /// Processor transaction identifier.
    pub id: String,
}

/// Billing details the processor stored about the payer.
///
/// Every field is optional from the relay's point of view. These are not
/// persisted with the donation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_middleware_response() {
        let body = json!({
            "amount": "10.00",
            "billingDetails": {
                "firstName": "Ada",
                "lastName": "Lovelace",
                "streetAddress": "12 St James's Square",
                "extendedAddress": null,
                "locality": "London",
                "region": "",
                "postalCode": "SW1Y 4JH",
                "countryName": "United Kingdom"
            },
            "id": "txn_8f3k2m"
        });

        let transaction: Transaction = serde_json::from_value(body).unwrap();
        assert_eq!(transaction.id, "txn_8f3k2m");
        assert_eq!(transaction.amount, "10.00");
        assert_eq!(transaction.billing_details.first_name.as_deref(), Some("Ada"));
        assert_eq!(transaction.billing_details.postal_code.as_deref(), Some("SW1Y 4JH"));
        assert_eq!(transaction.billing_details.extended_address, None);
        assert_eq!(transaction.billing_details.region.as_deref(), Some(""));
    }

    #[test]
    fn test_billing_details_may_be_absent() {
        let transaction: Transaction =
            serde_json::from_value(json!({"amount": "1.00", "id": "t1"})).unwrap();
        assert_eq!(transaction.billing_details, BillingDetails::default());
    }

    #[test]
    fn test_null_billing_details_decode_as_empty() {
        let transaction: Transaction = serde_json::from_value(json!({
            "amount": "10.00",
            "billingDetails": null,
            "id": "txn_charged"
        }))
        .unwrap();

        assert_eq!(transaction.id, "txn_charged");
        assert_eq!(transaction.billing_details, BillingDetails::default());
    }

    #[test]
    fn test_missing_transaction_id_is_rejected() {
        let result: Result<Transaction, _> = serde_json::from_value(json!({"amount": "1.00"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_then_decode_keeps_populated_fields() {
        let transaction = Transaction {
            amount: "25.50".to_string(),
            billing_details: BillingDetails {
                locality: Some("Freetown".to_string()),
                country_name: Some("Sierra Leone".to_string()),
                ..BillingDetails::default()
            },
            id: "txn_1".to_string(),
        };

        let encoded = serde_json::to_string(&transaction).unwrap();
        assert!(encoded.contains("\"countryName\":\"Sierra Leone\""));
        assert!(!encoded.contains("firstName"));

        let decoded: Transaction = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, transaction);
    }
}
