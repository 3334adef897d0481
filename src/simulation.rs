use std::path::Path;

use crate::component::FieldComponent;
use crate::grid::Dimension;
use crate::Error;

/// Receives progress notifications while a simulation runs.
pub trait Progress {
    fn started(&mut self, _num_steps: usize) {}
    /// Called after every completed step.
    fn advanced(&mut self, completed: usize, num_steps: usize);
    fn finished(&mut self, _num_steps: usize) {}
}

/// Emits a `tracing` event every time the simulation clears another `log_increment` percent.
#[derive(Clone, Debug)]
pub struct ProgressLogger {
    /// Increment in percent at which messages are sent.
    pub log_increment: usize,
    last_message_at: Option<usize>,
}

impl ProgressLogger {
    #[inline]
    pub fn new(log_increment: usize) -> Self {
        Self {
            log_increment: log_increment.max(1),
            last_message_at: None,
        }
    }
}

impl Default for ProgressLogger {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Progress for ProgressLogger {
    fn started(&mut self, _num_steps: usize) {
        self.last_message_at = None;
    }

    fn advanced(&mut self, completed: usize, num_steps: usize) {
        if num_steps == 0 {
            return;
        }
        let percent = completed * 100 / num_steps;
        if percent % self.log_increment == 0 && self.last_message_at != Some(percent) {
            tracing::info!("Simulating. {} % completed.", percent);
            self.last_message_at = Some(percent);
        }
    }
}

/// Shows progress on an `indicatif` progress bar.
pub struct BarProgress {
    bar: indicatif::ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            bar: indicatif::ProgressBar::new(0),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn started(&mut self, num_steps: usize) {
        self.bar.set_length(num_steps as u64);
        self.bar.set_position(0);
    }

    fn advanced(&mut self, completed: usize, _num_steps: usize) {
        self.bar.set_position(completed as u64);
    }

    fn finished(&mut self, _num_steps: usize) {
        self.bar.finish();
    }
}

/// Describes a simulation run.
#[derive(Default)]
pub struct RunDescriptor<'a> {
    /// How many steps to simulate. Runs the whole time axis if `None`.
    pub num_steps: Option<usize>,
    /// Where to report progress to. Without an observer, progress is only logged for
    /// un-segmented runs (`num_steps == None`).
    pub progress: Option<&'a mut dyn Progress>,
}

/// Anything that can be stepped through time: a single field or a group of synchronized
/// fields.
pub trait Simulate {
    /// The time axis.
    fn t(&self) -> &Dimension;

    /// The current step.
    fn step(&self) -> usize;

    /// Moves the step counter, e.g. to rewind or resume a simulation.
    fn set_step(&mut self, step: usize);

    fn matrices_assembled(&self) -> bool;

    /// Builds all operators from the current material state.
    fn assemble_matrices(&mut self) -> Result<(), Error>;

    /// Advances the state by one time increment.
    fn sim_step(&mut self) -> Result<(), Error>;

    /// Simulates `num_steps` steps (the whole time axis by default).
    fn simulate(&mut self, num_steps: Option<usize>) -> Result<(), Error> {
        self.run(RunDescriptor {
            num_steps,
            progress: None,
        })
    }

    /// Does a computational run.
    fn run(&mut self, desc: RunDescriptor) -> Result<(), Error> {
        match (desc.num_steps, desc.progress) {
            (num_steps, Some(progress)) => {
                let num_steps = num_steps.unwrap_or(self.t().samples);
                run_steps(self, num_steps, Some(progress))
            }
            (None, None) => {
                // log progress only if the simulation is not segmented
                let mut logger = ProgressLogger::default();
                let num_steps = self.t().samples;
                run_steps(self, num_steps, Some(&mut logger))
            }
            (Some(num_steps), None) => run_steps(self, num_steps, None),
        }
    }
}

fn run_steps<S: Simulate + ?Sized>(
    sim: &mut S,
    num_steps: usize,
    mut progress: Option<&mut dyn Progress>,
) -> Result<(), Error> {
    if !sim.matrices_assembled() {
        sim.assemble_matrices()?;
        tracing::info!("Matrices created.");
    }

    tracing::info!("Starting simulation of {} steps.", num_steps);
    if let Some(progress) = progress.as_deref_mut() {
        progress.started(num_steps);
    }

    for completed in 1..=num_steps {
        sim.sim_step()?;
        if let Some(progress) = progress.as_deref_mut() {
            progress.advanced(completed, num_steps);
        }
    }

    if let Some(progress) = progress.as_deref_mut() {
        progress.finished(num_steps);
    }
    tracing::info!("Simulation of {} steps completed.", num_steps);
    Ok(())
}

/// How outputs should be saved to file.
#[derive(Debug)]
pub struct SaveSettings<P: AsRef<Path>> {
    /// The path to the save file.
    pub filename: P,
    /// Whether or not to replace an existing file. Otherwise the outputs are added to it,
    /// replacing datasets of the same name.
    pub overwrite: bool,
}

/// Writes the signals of every output to an HDF5 file.
///
/// Each output becomes the dataset `/<component>/<region name>` with the shape
/// `(region indices, steps)`. Outputs without a region name are named by their position.
pub fn save_outputs<P: AsRef<Path>>(
    components: &[(&str, &FieldComponent)],
    t: &Dimension,
    x: &Dimension,
    settings: &SaveSettings<P>,
) -> Result<(), Error> {
    let filename = settings.filename.as_ref();
    let file = if filename.exists() && !settings.overwrite {
        hdf5::File::append(filename)?
    } else {
        hdf5::File::create(filename)?
    };

    for &(name, component) in components {
        if component.outputs().iter().all(|output| output.is_empty()) {
            continue;
        }
        let group = if file.link_exists(name) {
            file.group(name)?
        } else {
            file.create_group(name)?
        };

        for (n, output) in component.outputs().iter().enumerate() {
            if output.is_empty() {
                continue;
            }
            let dataset_name = match output.region().name() {
                "" => n.to_string(),
                region_name => region_name.to_string(),
            };
            if group.link_exists(&dataset_name) {
                group.unlink(&dataset_name)?;
            }

            let signals = output.to_array();
            group
                .new_dataset::<f64>()
                .shape(signals.dim())
                .create(dataset_name.as_str())?
                .write(signals.view())?;
        }
    }

    // save deltas as file attributes
    let dt_attr = file
        .new_attr::<f64>()
        .shape(hdf5::Extents::Scalar)
        .create("time_step");
    if let Ok(attr) = dt_attr {
        attr.write_scalar(&t.increment)?;
    }
    let dx_attr = file
        .new_attr::<f64>()
        .shape(hdf5::Extents::Scalar)
        .create("space_step");
    if let Ok(attr) = dx_attr {
        attr.write_scalar(&x.increment)?;
    }

    file.close()?;
    Ok(())
}
