//! Dirty-tracked recomputation of the aggregation pipeline.
//!
//! The orchestrator caches one [`AggregationResult`] and re-runs
//! hash → bin → dense write only when something it depends on changed:
//!
//! ```text
//!            set_props / update(changes)
//!   ┌───────┐ ─────────────────────────▶ ┌───────────────┐
//!   │ Clean │                            │ Dirty(reasons)│
//!   └───────┘ ◀───────────────────────── └───────────────┘
//!                 update() succeeded
//! ```
//!
//! Reasons that move cell boundaries (data, cell size, positions, viewport
//! in projected space, bounding box) re-hash the points. Reasons that only
//! change values (rule, weight accessor) re-bin the cached hash. Either way
//! a fresh dense buffer is allocated; buffers already handed out are never
//! written to again.

use std::collections::BTreeSet;
use std::sync::Arc;

use grid_common::{AggregationError, BoundingBox, Projection, Result};

use crate::accessor::PointAccessor;
use crate::bins::{AggregationRule, BinAggregator};
use crate::config::AggregatorConfig;
use crate::dense::{DenseGridWriter, SummaryRecords};
use crate::geometry::{CoordinateSpace, GridGeometry};
use crate::hasher::{hash_points, latitude_range, HashOptions, ProjectionMode};
use crate::result::AggregationResult;
use crate::types::GridHash;

/// Accessor whose update trigger fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessorKind {
    Position,
    Weight,
}

/// Why the cached result is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirtyReason {
    DataChanged,
    CellSizeChanged,
    /// Rule or bin ordering changed.
    AggregationRuleChanged,
    AccessorTriggerChanged { accessor: AccessorKind },
    /// Viewport or coordinate space changed while binning projected
    /// positions.
    ReprojectionNeeded,
    BoundingBoxChanged,
}

impl DirtyReason {
    /// Whether cell membership may have changed.
    pub fn requires_rehash(&self) -> bool {
        !matches!(
            self,
            Self::AggregationRuleChanged
                | Self::AccessorTriggerChanged {
                    accessor: AccessorKind::Weight
                }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationState {
    Clean,
    Dirty(BTreeSet<DirtyReason>),
}

impl AggregationState {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

/// Caller-controlled aggregation properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationProps {
    /// Meters in geographic space, projected units otherwise.
    pub cell_size: f64,
    pub rule: AggregationRule,
    pub space: CoordinateSpace,
    pub sort_bins: bool,
    /// Extent used for grid alignment, in the coordinates of `space`.
    /// Derived from the finite positions when `None`.
    pub bounding_box: Option<BoundingBox>,
}

impl AggregationProps {
    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self {
            cell_size: config.default_cell_size_m,
            rule: AggregationRule::Count,
            space: CoordinateSpace::Geographic,
            sort_bins: config.sort_bins,
            bounding_box: None,
        }
    }

    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_rule(mut self, rule: AggregationRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }
}

impl Default for AggregationProps {
    fn default() -> Self {
        Self::from_config(&AggregatorConfig::default())
    }
}

/// Accessor update triggers reported by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateTriggers {
    pub all: bool,
    pub position: bool,
    pub weight: bool,
}

/// Change notifications accompanying an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    pub data_changed: bool,
    pub viewport_changed: bool,
    pub update_triggers: UpdateTriggers,
}

impl ChangeFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn data() -> Self {
        Self {
            data_changed: true,
            ..Self::default()
        }
    }

    pub fn viewport() -> Self {
        Self {
            viewport_changed: true,
            ..Self::default()
        }
    }
}

/// Records to aggregate and how to read them.
pub struct AggregationInput<'a, T, A> {
    pub data: &'a [T],
    pub accessor: &'a A,
    /// Required in projected space.
    pub projection: Option<&'a dyn Projection>,
}

impl<'a, T, A> AggregationInput<'a, T, A> {
    pub fn new(data: &'a [T], accessor: &'a A) -> Self {
        Self {
            data,
            accessor,
            projection: None,
        }
    }

    pub fn with_projection(mut self, projection: &'a dyn Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    fn data_identity(&self) -> (usize, usize) {
        (self.data.as_ptr() as usize, self.data.len())
    }
}

/// Owns the current aggregation of one point layer.
#[derive(Debug)]
pub struct AggregationOrchestrator {
    config: AggregatorConfig,
    props: AggregationProps,
    state: AggregationState,
    current: Arc<AggregationResult>,
    last_data: Option<(usize, usize)>,
    recomputations: u64,
}

impl AggregationOrchestrator {
    /// Create an orchestrator. It starts dirty so the first update runs the
    /// pipeline.
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate().map_err(AggregationError::config)?;
        let props = AggregationProps::from_config(&config);
        let current = Arc::new(AggregationResult::empty(props.rule, config.dense_stride));

        Ok(Self {
            config,
            props,
            state: AggregationState::Dirty(BTreeSet::from([DirtyReason::DataChanged])),
            current,
            last_data: None,
            recomputations: 0,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn props(&self) -> &AggregationProps {
        &self.props
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    /// Last successfully computed result.
    pub fn current(&self) -> Arc<AggregationResult> {
        Arc::clone(&self.current)
    }

    /// Number of pipeline runs so far.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    pub fn mark_dirty(&mut self, reason: DirtyReason) {
        match &mut self.state {
            AggregationState::Dirty(reasons) => {
                reasons.insert(reason);
            }
            AggregationState::Clean => {
                self.state = AggregationState::Dirty(BTreeSet::from([reason]));
            }
        }
    }

    /// Replace the properties, marking the result dirty for every field
    /// that changed.
    pub fn set_props(&mut self, props: AggregationProps) -> Result<()> {
        if !(props.cell_size.is_finite() && props.cell_size > 0.0) {
            return Err(AggregationError::InvalidCellSize(props.cell_size));
        }
        if let Some(bbox) = &props.bounding_box {
            if !bbox.is_valid() {
                return Err(AggregationError::InvalidBbox(format!("{bbox:?}")));
            }
        }

        for reason in diff_props(&self.props, &props) {
            self.mark_dirty(reason);
        }
        self.props = props;
        Ok(())
    }

    /// Bring the result up to date and return it.
    ///
    /// When clean this returns the cached `Arc` itself. On error the
    /// orchestrator stays dirty and keeps the previous result.
    pub fn update<T, A>(&mut self, input: &AggregationInput<'_, T, A>, changes: &ChangeFlags) -> Result<Arc<AggregationResult>>
    where
        A: PointAccessor<T>,
    {
        for reason in self.diff_changes(input, changes) {
            self.mark_dirty(reason);
        }

        let reasons = match &self.state {
            AggregationState::Clean => {
                tracing::trace!(cells = self.current.grid_hash.len(), "Aggregation clean, reusing result");
                return Ok(self.current());
            }
            AggregationState::Dirty(reasons) => reasons.clone(),
        };

        let rehash = reasons.iter().any(DirtyReason::requires_rehash);
        tracing::debug!(reasons = ?reasons, rehash, records = input.data.len(), "Recomputing aggregation");

        let result = if rehash {
            self.rehash(input)?
        } else {
            self.rebin(input, Arc::clone(&self.current.grid_hash))?
        };

        tracing::debug!(
            cells = result.grid_hash.len(),
            total_count = result.total_count,
            dropped = result.dropped_points,
            min_value = result.min_value,
            max_value = result.max_value,
            "Aggregation updated"
        );

        self.current = Arc::new(result);
        self.state = AggregationState::Clean;
        self.recomputations += 1;
        Ok(self.current())
    }

    fn diff_changes<T, A>(&mut self, input: &AggregationInput<'_, T, A>, changes: &ChangeFlags) -> Vec<DirtyReason> {
        let mut reasons = Vec::new();

        let identity = input.data_identity();
        if changes.data_changed || self.last_data != Some(identity) {
            reasons.push(DirtyReason::DataChanged);
        }
        self.last_data = Some(identity);

        if changes.viewport_changed && self.props.space == CoordinateSpace::Projected {
            reasons.push(DirtyReason::ReprojectionNeeded);
        }

        let triggers = changes.update_triggers;
        if triggers.all || triggers.position {
            reasons.push(DirtyReason::AccessorTriggerChanged {
                accessor: AccessorKind::Position,
            });
        }
        if (triggers.all || triggers.weight) && self.props.rule.uses_weight() {
            reasons.push(DirtyReason::AccessorTriggerChanged {
                accessor: AccessorKind::Weight,
            });
        }

        reasons
    }

    fn projection_mode<'p>(&self, projection: Option<&'p dyn Projection>) -> Result<ProjectionMode<'p>> {
        match self.props.space {
            CoordinateSpace::Geographic => Ok(ProjectionMode::Geographic),
            CoordinateSpace::Projected => projection
                .map(ProjectionMode::Projected)
                .ok_or_else(|| AggregationError::config("projected space requires a projection")),
        }
    }

    fn empty_result(&self, dropped_points: usize) -> AggregationResult {
        AggregationResult {
            dropped_points,
            ..AggregationResult::empty(self.props.rule, self.config.dense_stride)
        }
    }

    fn rehash<T, A>(&self, input: &AggregationInput<'_, T, A>) -> Result<AggregationResult>
    where
        A: PointAccessor<T>,
    {
        let mode = self.projection_mode(input.projection)?;

        let bbox = match self.props.bounding_box {
            Some(bbox) => Some(bbox),
            None => self.derived_bbox(input, mode),
        };
        let Some(bbox) = bbox else {
            tracing::debug!(records = input.data.len(), "No finite positions, empty aggregation");
            return Ok(self.empty_result(input.data.len()));
        };

        let geometry = match GridGeometry::compute(&bbox, self.props.cell_size, self.props.space) {
            Ok(geometry) => geometry,
            Err(AggregationError::DegenerateGeometry(reason)) => {
                tracing::debug!(reason = %reason, "Degenerate grid geometry, empty aggregation");
                return Ok(self.empty_result(input.data.len()));
            }
            Err(err) => return Err(err),
        };

        let options = HashOptions {
            cell_size: self.props.cell_size,
            mode,
            frame: Some(geometry.frame),
        };
        let hashed = hash_points(input.data, input.accessor, &options);
        if hashed.degenerate {
            return Ok(self.empty_result(input.data.len()));
        }

        let mut result = self.bin_and_write(input, Arc::new(hashed.grid_hash), Some(geometry))?;
        result.dropped_points = hashed.dropped;
        Ok(result)
    }

    /// Extent of the finite positions in grid space.
    ///
    /// In geographic space the latitude extent also covers records whose
    /// longitude is invalid, so the offset latitude is the midpoint of every
    /// finite latitude, as in [`hash_points`] without a frame.
    fn derived_bbox<T, A>(&self, input: &AggregationInput<'_, T, A>, mode: ProjectionMode<'_>) -> Option<BoundingBox>
    where
        A: PointAccessor<T>,
    {
        let mut bbox = BoundingBox::from_coords(input.data.iter().filter_map(|record| {
            let position = input.accessor.position(record);
            position
                .is_finite()
                .then(|| mode.apply(position.lng, position.lat))
        }))?;

        if matches!(mode, ProjectionMode::Geographic) {
            if let Some((min_lat, max_lat)) = latitude_range(input.data, input.accessor) {
                bbox.min_y = bbox.min_y.min(min_lat);
                bbox.max_y = bbox.max_y.max(max_lat);
            }
        }
        Some(bbox)
    }

    fn rebin<T, A>(&self, input: &AggregationInput<'_, T, A>, grid_hash: Arc<GridHash>) -> Result<AggregationResult>
    where
        A: PointAccessor<T>,
    {
        let mut result = self.bin_and_write(input, grid_hash, self.current.geometry)?;
        result.dropped_points = self.current.dropped_points;
        Ok(result)
    }

    fn bin_and_write<T, A>(
        &self,
        input: &AggregationInput<'_, T, A>,
        grid_hash: Arc<GridHash>,
        geometry: Option<GridGeometry>,
    ) -> Result<AggregationResult>
    where
        A: PointAccessor<T>,
    {
        let Some(geometry) = geometry else {
            return Ok(self.empty_result(0));
        };

        let bins = BinAggregator::new(self.props.rule)
            .with_sorting(self.props.sort_bins)
            .aggregate(&grid_hash, input.data, input.accessor)?;

        let dense_buffer = DenseGridWriter::new(self.config.dense_stride)?
            .with_max_cells(self.config.max_dense_cells)
            .write(&bins, geometry.columns, geometry.rows)?;

        let value_domain = bins.value_range(self.config.lower_percentile, self.config.upper_percentile);

        Ok(AggregationResult {
            grid_offset: geometry.offset(),
            geometry: Some(geometry),
            rule: self.props.rule,
            summary: SummaryRecords::from_bins(&bins),
            min_value: bins.min_value,
            max_value: bins.max_value,
            total_count: bins.total_count,
            dense_buffer: Arc::new(dense_buffer),
            dropped_points: 0,
            value_domain,
            bins,
            grid_hash,
        })
    }
}

fn diff_props(old: &AggregationProps, new: &AggregationProps) -> Vec<DirtyReason> {
    let mut reasons = Vec::new();
    if old.cell_size != new.cell_size {
        reasons.push(DirtyReason::CellSizeChanged);
    }
    if old.rule != new.rule || old.sort_bins != new.sort_bins {
        reasons.push(DirtyReason::AggregationRuleChanged);
    }
    if old.space != new.space {
        reasons.push(DirtyReason::ReprojectionNeeded);
    }
    if old.bounding_box != new.bounding_box {
        reasons.push(DirtyReason::BoundingBoxChanged);
    }
    reasons
}
