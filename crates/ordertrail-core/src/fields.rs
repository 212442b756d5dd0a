//! The catalog of interesting field paths and their display labels.
//!
//! The catalog is configuration: it decides which changes the history view
//! shows and how each path is labelled. It plays no part in change detection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{order, record::FieldPath};

/// One interesting path and its human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabel {
  pub path:  FieldPath,
  pub label: String,
}

/// Ordered set of interesting paths. Order is presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
  fields: Vec<FieldLabel>,
}

/// Paths tracked for vehicle orders, with their labels.
const ORDER_FIELDS: &[(&str, &str)] = &[
  (order::ORDER_STATUS, "Order Status"),
  (order::VIN, "VIN"),
  (order::LICENSE_PLATE, "License Plate"),
  (order::MKT_OPTIONS, "Vehicle Options"),
  (order::OWNER_COMPANY_NAME, "Company Name"),
  (order::DELIVERY_WINDOW, "Delivery Window"),
  (order::DELIVERY_APPOINTMENT, "Delivery Appointment"),
  (order::ETA_TO_DELIVERY_CENTER, "ETA to Delivery Center"),
  (order::VEHICLE_LOCATION, "Vehicle Location"),
  (order::DELIVERY_TYPE, "Delivery Method"),
  (order::DELIVERY_CENTER, "Delivery Center"),
  (order::VEHICLE_ODOMETER, "Odometer"),
  (order::RESERVATION_DATE, "Reservation Date"),
  (order::ORDER_BOOKED_DATE, "Order Booked Date"),
];

impl FieldCatalog {
  /// Build a catalog from `(path, label)` pairs. Later duplicates of a path
  /// replace the earlier label but keep its position.
  pub fn from_pairs<P, L>(pairs: impl IntoIterator<Item = (P, L)>) -> Self
  where
    P: Into<FieldPath>,
    L: Into<String>,
  {
    let mut fields: Vec<FieldLabel> = Vec::new();
    for (path, label) in pairs {
      let path = path.into();
      let label = label.into();
      match fields.iter_mut().find(|f| f.path == path) {
        Some(existing) => existing.label = label,
        None => fields.push(FieldLabel { path, label }),
      }
    }
    Self { fields }
  }

  /// The built-in catalog for vehicle orders.
  pub fn orders() -> Self { Self::from_pairs(ORDER_FIELDS.iter().copied()) }

  pub fn contains(&self, path: &str) -> bool {
    self.fields.iter().any(|f| f.path == path)
  }

  /// The label for `path`, falling back to the path itself.
  pub fn label<'a>(&'a self, path: &'a str) -> &'a str {
    self
      .fields
      .iter()
      .find(|f| f.path == path)
      .map_or(path, |f| f.label.as_str())
  }

  /// The interesting paths, for [`project`](crate::history::project).
  pub fn paths(&self) -> BTreeSet<FieldPath> {
    self.fields.iter().map(|f| f.path.clone()).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = &FieldLabel> { self.fields.iter() }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl Default for FieldCatalog {
  fn default() -> Self { Self::orders() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn order_catalog_has_all_tracked_fields() {
    let c = FieldCatalog::orders();
    assert_eq!(c.len(), 14);
    assert!(c.contains("order.orderStatus"));
    assert!(c.contains("details.tasks.scheduling.deliveryType"));
    assert!(!c.contains("order.modelCode"));
  }

  #[test]
  fn label_falls_back_to_path() {
    let c = FieldCatalog::orders();
    assert_eq!(c.label("order.vin"), "VIN");
    assert_eq!(c.label("order.modelCode"), "order.modelCode");
  }

  #[test]
  fn duplicate_paths_keep_first_position() {
    let c = FieldCatalog::from_pairs([("a", "A"), ("b", "B"), ("a", "Alpha")]);
    let got: Vec<_> = c.iter().map(|f| (f.path.as_str(), f.label.as_str())).collect();
    assert_eq!(got, vec![("a", "Alpha"), ("b", "B")]);
  }

  #[test]
  fn deserialises_from_a_list() {
    let c: FieldCatalog = serde_json::from_str(
      r#"[{"path":"order.orderStatus","label":"Status"}]"#,
    )
    .unwrap();
    assert_eq!(c.label("order.orderStatus"), "Status");
    assert_eq!(c.paths().len(), 1);
  }
}
