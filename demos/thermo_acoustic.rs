use fdfield::prelude::*;

use std::f64::consts::PI;

fn main() {
    tracing_subscriber::fmt::init();

    let x_samples = 200;
    let x_delta = 5e-4; // [m]
    let t_delta = 5e-8; // [s]
    let t_samples = 20_000;

    let mut air = AcousticMaterial::new(343.0, 1.2); // [m / s], [kg / m^3]
    air.shear_viscosity = 18.6e-6; // [Pa s]
    air.thermal_conductivity = 0.026; // [W / m K]
    air.isobaric_heat_cap = 1005.0; // [J / kg K]
    air.isochoric_heat_cap = 718.0; // [J / kg K]

    let mut fields = thermo_acoustic_1d(ThermoAcoustic1DDescriptor {
        x_samples,
        x_delta,
        t_samples,
        t_delta,
        thermal_material: ThermalMaterial::new(1005.0, 1.2, 0.026),
        acoustic_material: air,
        stepping: 10,
    })
    .unwrap();
    assert!(fields.is_stable(), "discretization is unstable");

    // continuous 20 kHz excitation in the middle of the line
    let excitation: Vec<f64> = (0..t_samples)
        .map(|n| 1e3 * f64::sin(2.0 * PI * 20e3 * n as f64 * t_delta)) // [Pa]
        .collect();
    let center = (x_samples / 2) as f64 * x_delta;
    let source = fields.grid().get_point_region(&[center], "source").unwrap();
    fields
        .component_mut("pressure")
        .unwrap()
        .add_boundary(source, BoundaryValue::Signal(excitation), false)
        .unwrap();

    let line = fields
        .grid()
        .get_line_region(&[0.0], &[(x_samples - 1) as f64 * x_delta], "line")
        .unwrap();
    fields
        .component_mut("temperature")
        .unwrap()
        .add_output(line)
        .unwrap();

    println!("-- Run Part 1 --");
    // let the sound field build up
    fields
        .run(RunDescriptor {
            num_steps: Some(t_samples / 2),
            progress: Some(&mut BarProgress::new()),
        })
        .unwrap();

    println!("-- Run Part 2 --");
    fields
        .run(RunDescriptor {
            num_steps: Some(t_samples / 2),
            progress: Some(&mut BarProgress::new()),
        })
        .unwrap();

    let temperature = &fields.component("temperature").unwrap().values;
    println!(
        "Maximum temperature rise: {:.3e} K",
        temperature.fold(0.0, |max: f64, &t| max.max(t))
    );

    std::fs::create_dir_all("data").unwrap();
    save_outputs(
        &fields.components(),
        fields.t(),
        fields.x(),
        &SaveSettings {
            filename: "data/thermo_acoustic.h5",
            overwrite: true,
        },
    )
    .unwrap();
}
