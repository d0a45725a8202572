use std::sync::Arc;

use thermocal_hardware::{BathModel, SimulatedAdc, SimulatedProbe, Thermistor};
use thermocal_traits::{Adc, ManualClock, TempProbe};

#[test]
fn adc_counts_rise_as_the_bath_cools() {
    let clock = ManualClock::new();
    let bath = Arc::new(BathModel::new(Arc::new(clock.clone()), 140.0, 30.0, 20_000.0));
    let mut adc = SimulatedAdc::new(bath.clone(), Thermistor::default(), 0);
    let mut probe = SimulatedProbe::new(bath, 750);

    let mut last_raw = adc.read().unwrap();
    let mut last_temp = f32::INFINITY;
    for _ in 0..10 {
        probe.request_conversion();
        clock.advance(5_000);
        let raw = adc.read().unwrap();
        let temp = probe.read_temp_f();
        assert!(raw > last_raw, "{raw} <= {last_raw}");
        assert!(temp < last_temp, "{temp} >= {last_temp}");
        last_raw = raw;
        last_temp = temp;
    }
}

#[test]
fn probe_readings_are_quantized() {
    let clock = ManualClock::new();
    let bath = Arc::new(BathModel::new(Arc::new(clock.clone()), 77.0, 77.0, 1.0));
    let mut probe = SimulatedProbe::new(bath, 0);
    probe.request_conversion();
    let t = f64::from(probe.read_temp_f());
    let steps = t / thermocal_hardware::sim::PROBE_RESOLUTION_F;
    assert!((steps - steps.round()).abs() < 1e-3, "{t}");
}
