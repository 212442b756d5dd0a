//! A thin typed view over an order record.
//!
//! Order records are `{order: {...}, details: {tasks: {...}}}` trees with no
//! enforced schema. [`OrderView`] reads the well-known fields by path and
//! never fails: a missing or mistyped field is simply `None`.

use serde_json::Value;

use crate::record::{EntityKey, value_at};

pub const REFERENCE_NUMBER: &str = "order.referenceNumber";
pub const ORDER_STATUS: &str = "order.orderStatus";
pub const MODEL_CODE: &str = "order.modelCode";
pub const VIN: &str = "order.vin";
pub const MKT_OPTIONS: &str = "order.mktOptions";
pub const OWNER_COMPANY_NAME: &str = "order.ownerCompanyName";
pub const LICENSE_PLATE: &str = "details.tasks.deliveryDetails.regData.reggieLicensePlate";
pub const DELIVERY_WINDOW: &str = "details.tasks.scheduling.deliveryWindowDisplay";
pub const DELIVERY_APPOINTMENT: &str = "details.tasks.scheduling.apptDateTimeAddressStr";
pub const DELIVERY_TYPE: &str = "details.tasks.scheduling.deliveryType";
pub const DELIVERY_CENTER: &str = "details.tasks.scheduling.deliveryAddressTitle";
pub const ETA_TO_DELIVERY_CENTER: &str = "details.tasks.finalPayment.data.etaToDeliveryCenter";
pub const VEHICLE_LOCATION: &str = "details.tasks.registration.orderDetails.vehicleRoutingLocation";
pub const VEHICLE_ODOMETER: &str = "details.tasks.registration.orderDetails.vehicleOdometer";
pub const RESERVATION_DATE: &str = "details.tasks.registration.orderDetails.reservationDate";
pub const ORDER_BOOKED_DATE: &str = "details.tasks.registration.orderDetails.orderBookedDate";

/// Borrowed typed accessors over an order record.
#[derive(Debug, Clone, Copy)]
pub struct OrderView<'a> {
  record: &'a Value,
}

impl<'a> OrderView<'a> {
  pub fn new(record: &'a Value) -> Self { Self { record } }

  /// The raw value at `path`.
  pub fn get(&self, path: &str) -> Option<&'a Value> { value_at(self.record, path) }

  /// The string at `path`; `None` if missing, not a string, or blank.
  pub fn text(&self, path: &str) -> Option<&'a str> {
    self
      .get(path)
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
  }

  /// The order's reference number, used as its entity key.
  pub fn entity_key(&self) -> Option<EntityKey> {
    self.text(REFERENCE_NUMBER).map(str::to_owned)
  }

  pub fn status(&self) -> Option<&'a str> { self.text(ORDER_STATUS) }

  pub fn model_code(&self) -> Option<&'a str> { self.text(MODEL_CODE) }

  pub fn vin(&self) -> Option<&'a str> { self.text(VIN) }

  pub fn license_plate(&self) -> Option<&'a str> { self.text(LICENSE_PLATE) }

  /// Vehicle option codes, split from the comma-separated list.
  pub fn options(&self) -> Vec<&'a str> {
    self
      .text(MKT_OPTIONS)
      .map(|s| s.split(',').map(str::trim).filter(|o| !o.is_empty()).collect())
      .unwrap_or_default()
  }
}
