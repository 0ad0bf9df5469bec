//! Test to verify test infrastructure works correctly

mod common;

use common::builders::DriveLogBuilder;
use common::ts;

#[test]
fn test_infrastructure_setup() {
    let table = DriveLogBuilder::new()
        .accel(25.6, -12.8)
        .parked(3)
        .driving(2, 1000.0)
        .build();

    assert_eq!(table.len(), 5);
    assert_eq!(table.timestamps()[0], ts(0));
    assert_eq!(table.value("Accel_Y", 0), Some(-12.8));
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
