//! Fluent builder for constructing a [`Simulation`].

use mas_core::{MasConfig, StepClock};
use mas_layer::{LayerError, LayerPath, World};
use mas_spatial::{Bounds, IndexRegistry, Octree, SpatialIndex};

use crate::{Action, AgentSampler, ConflictSolver, Scheduler, SimError, SimResult, Simulation, SimulationManager};

/// Fluent builder for [`Simulation`].
///
/// # Required inputs
///
/// - [`MasConfig`] — step duration, duration, thread groups, threshold, …
/// - [`World`] — the layer tree and the agents it owns
///
/// # Optional inputs (have defaults)
///
/// | Method                  | Default                          |
/// |-------------------------|----------------------------------|
/// | `.top_layer(p)`         | The root layer                   |
/// | `.solver(s)`            | No conflict solver               |
/// | `.sampler(s)`           | [`UniformSampler`][crate::UniformSampler] |
/// | `.index(p, i)`          | No spatial index                 |
/// | `.octree(name, p, b)`   | No spatial index                 |
/// | `.action(a)`            | No scheduled action              |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(config, world)
///     .solver(Box::new(SpatialConflictSolver))
///     .octree("crowd", LayerPath::parse("/crowd"), Bounds::new([0.0; 3], [100.0; 3]))
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config:    MasConfig,
    world:     World,
    top_layer: Option<LayerPath>,
    solvers:   Vec<Box<dyn ConflictSolver>>,
    sampler:   Option<Box<dyn AgentSampler>>,
    indices:   Vec<(LayerPath, Box<dyn SpatialIndex>)>,
    octrees:   Vec<(String, LayerPath, Bounds<[f64; 3]>)>,
    actions:   Vec<Box<dyn Action>>,
}

impl SimBuilder {
    /// Create a builder with all required inputs.
    pub fn new(config: MasConfig, world: World) -> Self {
        Self {
            config,
            world,
            top_layer: None,
            solvers:   Vec::new(),
            sampler:   None,
            indices:   Vec::new(),
            octrees:   Vec::new(),
            actions:   Vec::new(),
        }
    }

    /// Simulate only the agents under `path`.
    pub fn top_layer(mut self, path: LayerPath) -> Self {
        self.top_layer = Some(path);
        self
    }

    /// Append a conflict solver; solvers run in the order they were added.
    pub fn solver(mut self, solver: Box<dyn ConflictSolver>) -> Self {
        self.solvers.push(solver);
        self
    }

    /// Strategy choosing the executed agents when `agents_per_step` is set.
    pub fn sampler(mut self, sampler: Box<dyn AgentSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Register `index` as the spatial index of the agents under `layer`.
    pub fn index(mut self, layer: LayerPath, index: Box<dyn SpatialIndex>) -> Self {
        self.indices.push((layer, index));
        self
    }

    /// Register a 3-D octree over `region` with the configured bucket
    /// capacity.
    pub fn octree(mut self, name: impl Into<String>, layer: LayerPath, region: Bounds<[f64; 3]>) -> Self {
        self.octrees.push((name.into(), layer, region));
        self
    }

    pub fn action(mut self, action: Box<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    /// Validate the inputs and assemble the simulation.
    ///
    /// # Errors
    ///
    /// - [`SimError::Core`] if the configuration is invalid.
    /// - [`SimError::Layer`] if an index refers to a missing layer.
    /// - [`SimError::Spatial`] if an octree region is inverted.
    /// - [`SimError::ActionRefused`] for a punctual action scheduled before
    ///   time zero.
    pub fn build(self) -> SimResult<Simulation> {
        self.config.validate()?;
        let ctx = self.world.ctx().clone();

        let clock = StepClock::new(self.config.step_duration, self.config.duration)?;
        let mut scheduler = Scheduler::new(clock);
        for action in self.actions {
            scheduler.add_action(action)?;
        }

        let mut manager = SimulationManager::new(ctx.clone(), &self.config)?;
        manager.set_top_layer(self.top_layer.unwrap_or_else(LayerPath::root));
        for solver in self.solvers {
            manager.add_conflict_solver(solver);
        }
        if let Some(sampler) = self.sampler {
            manager.set_sampler(sampler);
        }

        let mut registry = IndexRegistry::new(ctx);
        let mut indices = self.indices;
        for (name, layer, region) in self.octrees {
            let tree: Octree = Octree::new(name, region, self.config.bucket_capacity)?;
            indices.push((layer, Box::new(tree)));
        }
        for (layer, index) in indices {
            if self.world.layer(&layer).is_none() {
                return Err(SimError::Layer(LayerError::NoSuchLayer(layer)));
            }
            registry.register(layer, index)?;
        }

        Ok(Simulation::from_parts(self.config, self.world, registry, manager, scheduler))
    }
}
