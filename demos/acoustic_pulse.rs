use fdfield::prelude::*;

use std::f64::consts::PI;

fn main() {
    tracing_subscriber::fmt::init();

    let x_samples = 400;
    let x_delta = 1e-4; // [m]
    let t_delta = 1e-8; // [s]
    let t_samples = 4_000;

    let mut water = AcousticMaterial::new(1500.0, 1000.0); // [m / s], [kg / m^3]
    water.shear_viscosity = 1e-3; // [Pa s]

    let mut field = Acoustic1D::new(Field1DDescriptor {
        x_samples,
        x_delta,
        t_samples,
        t_delta,
        material: water,
    });
    println!(
        "\n-- General Simulation Info --\n\
        # of points:  {}\n\
        Δx:           {:<9.2e} m\n\
        Δt:           {:<9.2e} s\n\
        stable:       {}\n",
        x_samples,
        x_delta,
        t_delta,
        field.is_stable(),
    );

    // a denser layer in the second half of the line
    let layer = field
        .grid()
        .get_line_region(&[0.02], &[(x_samples - 1) as f64 * x_delta], "layer")
        .unwrap();
    field
        .grid_mut()
        .add_material_region(layer, AcousticMaterial::new(2500.0, 1200.0))
        .unwrap();

    // one period of a 1 MHz sine burst at the left end
    let burst: Vec<f64> = (0..t_samples)
        .map(|n| {
            let t = n as f64 * t_delta;
            if t < 1e-6 {
                f64::sin(2.0 * PI * 1e6 * t)
            } else {
                0.0
            }
        })
        .collect();
    let source = field.grid().get_point_region(&[0.0], "source").unwrap();
    field
        .pressure
        .add_boundary(source, BoundaryValue::Signal(burst), false)
        .unwrap();

    let sensor = field.grid().get_point_region(&[0.03], "sensor").unwrap();
    field.pressure.add_output(sensor).unwrap();

    field
        .run(RunDescriptor {
            num_steps: None,
            progress: Some(&mut BarProgress::new()),
        })
        .unwrap();

    std::fs::create_dir_all("data").unwrap();
    save_outputs(
        &field.components(),
        &field.grid().t,
        &field.grid().x,
        &SaveSettings {
            filename: "data/acoustic_pulse.h5",
            overwrite: true,
        },
    )
    .unwrap();
}
