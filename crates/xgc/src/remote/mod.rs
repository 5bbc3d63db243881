//! Remote-Side Collection Manager
//!
//! Consumes the peer's edge graph and severs the export slots nothing
//! reaches any more. Phases of [`CollectionManager::collect`]:
//!
//! ```text
//! Repair ──▶ RootMark ──▶ LivenessCheck ──▶ Unlink ──▶ InstallOverrides
//!   │           │               │               │            (first cycle)
//!   │           │               │               └─ detach every non-root slot
//!   │           │               └─ attach successor slots to live proxies
//!   │           └─ bitmap of export slots named by "root"
//!   └─ restore slots recorded by proxies that survived
//! ```
//!
//! Every phase is planned against the tables before any of them is
//! touched. An invalid graph, a broken repair record or a failed
//! allocation rejects the cycle with the tables exactly as they were.
//!
//! [`CollectionManager::collect_and_force_native_gc`] runs
//! RootMark → LivenessCheck → Unlink, then the native collector, then
//! Repair, so a dead cross-heap cycle is reclaimed within one call.

use crate::bridge::Runtime;
use crate::bridge::runtime::RepairPlan;
use crate::ensure;
use crate::error::{Result, XgcError};
use crate::graph::EdgeGraph;
use crate::heap::CollectOutcome;
use crate::marker::MarkBitmap;
use crate::object::{ObjId, RepairRecord};
use crate::stats::CycleTimer;
use crate::tables::{ExportIndex, ImportIndex};
use rustc_hash::FxHashMap;
use std::fmt;
use std::time::Duration;

/// Manager phases, in `collect` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Repair,
    RootMark,
    LivenessCheck,
    Unlink,
    InstallOverrides,
    NativeGc,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Repair => "repair",
            Phase::RootMark => "root_mark",
            Phase::LivenessCheck => "liveness_check",
            Phase::Unlink => "unlink",
            Phase::InstallOverrides => "install_overrides",
            Phase::NativeGc => "native_gc",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one manager call did
#[derive(Debug, Clone, Default)]
pub struct ManagerReport {
    /// Export slots named by `"root"`
    pub roots: usize,
    /// Proxies that received a repair record
    pub records: usize,
    /// Export slots detached
    pub unlinked: usize,
    /// Export slots restored
    pub repaired: usize,
    /// Overrides were installed by this call
    pub installed_overrides: bool,
    /// Native collection result, forced mode only
    pub native: Option<CollectOutcome>,
    /// Phase durations, in execution order
    pub phases: Vec<(&'static str, Duration)>,
}

/// Edge graph in this side's numbering, checked against its tables
///
/// Keys become import slots, roots and successors become export slots.
struct RemoteGraph {
    roots: Vec<ExportIndex>,
    edges: Vec<(ImportIndex, Vec<ExportIndex>)>,
}

impl RemoteGraph {
    fn new(graph: &EdgeGraph, runtime: &Runtime) -> Result<Self> {
        let export_len = runtime.exports.len();
        let import_len = runtime.imports.len();

        for j in &graph.root {
            ensure!(
                (j.0 as usize) < export_len,
                XgcError::InvalidEdgeGraph(format!("root slot {} out of range ({})", j, export_len))
            );
        }
        for (i, successors) in &graph.edges {
            ensure!(
                (i.0 as usize) < import_len,
                XgcError::InvalidEdgeGraph(format!("key {} out of range ({})", i, import_len))
            );
            for j in successors {
                ensure!(
                    (j.0 as usize) < export_len,
                    XgcError::InvalidEdgeGraph(format!(
                        "successor {} of {} out of range ({})",
                        j, i, export_len
                    ))
                );
            }
        }

        Ok(Self {
            roots: graph.root.iter().map(|j| j.across()).collect(),
            edges: graph
                .edges
                .iter()
                .map(|(i, succ)| (i.across(), succ.iter().map(|j| j.across()).collect()))
                .collect(),
        })
    }
}

/// Changes to apply once every phase has been planned
struct Plan {
    repair: RepairPlan,
    records: Vec<(ObjId, RepairRecord)>,
    unlink: Vec<(ExportIndex, ObjId)>,
    unlinked: FxHashMap<ObjId, ExportIndex>,
}

/// CollectionManager - remote-side driver of a collection cycle
#[derive(Debug, Default)]
pub struct CollectionManager {
    cycles: u64,
}

impl CollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed manager calls
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run Repair → RootMark → LivenessCheck → Unlink → InstallOverrides
    pub fn collect(&mut self, runtime: &mut Runtime, graph_json: &str) -> Result<ManagerReport> {
        let graph = EdgeGraph::from_json(graph_json)?;
        self.collect_graph(runtime, &graph)
    }

    /// [`collect`](Self::collect) for an already parsed graph
    pub fn collect_graph(&mut self, runtime: &mut Runtime, graph: &EdgeGraph) -> Result<ManagerReport> {
        let graph = RemoteGraph::new(graph, runtime)?;
        let mut timer = CycleTimer::new();

        let proxies = runtime.imports.live_proxies(&runtime.heap);
        let repair = runtime.plan_repair(proxies.into_iter().map(|(_, p)| p))?;
        timer.lap(Phase::Repair.as_str());

        let plan = Self::plan(runtime, &graph, repair, &mut timer)?;
        let mut report = ManagerReport {
            roots: graph.roots.len(),
            ..ManagerReport::default()
        };

        report.repaired = runtime.commit_repair(plan.repair);
        runtime.exports.finish_repair();
        report.records = Self::attach_records(runtime, plan.records);
        report.unlinked = Self::unlink(runtime, plan.unlink, plan.unlinked);

        if !runtime.exports.overrides_installed() {
            runtime.exports.install_overrides();
            report.installed_overrides = true;
            log::debug!("{}: export overrides installed", runtime.name());
        }
        timer.lap(Phase::InstallOverrides.as_str());

        self.finish(runtime, report, timer)
    }

    /// Run RootMark → LivenessCheck → Unlink → native collection → Repair
    pub fn collect_and_force_native_gc(
        &mut self,
        runtime: &mut Runtime,
        graph_json: &str,
    ) -> Result<ManagerReport> {
        let graph = EdgeGraph::from_json(graph_json)?;
        self.collect_graph_and_force_native_gc(runtime, &graph)
    }

    /// [`collect_and_force_native_gc`](Self::collect_and_force_native_gc)
    /// for an already parsed graph
    pub fn collect_graph_and_force_native_gc(
        &mut self,
        runtime: &mut Runtime,
        graph: &EdgeGraph,
    ) -> Result<ManagerReport> {
        let graph = RemoteGraph::new(graph, runtime)?;
        let mut timer = CycleTimer::new();

        let plan = Self::plan(runtime, &graph, RepairPlan::default(), &mut timer)?;
        let mut report = ManagerReport {
            roots: graph.roots.len(),
            ..ManagerReport::default()
        };

        report.records = Self::attach_records(runtime, plan.records);
        report.unlinked = Self::unlink(runtime, plan.unlink, plan.unlinked);

        report.native = Some(runtime.native_gc());
        timer.lap(Phase::NativeGc.as_str());

        report.repaired = runtime.repair_all()?;
        timer.lap(Phase::Repair.as_str());

        self.finish(runtime, report, timer)
    }

    /// Plan RootMark, LivenessCheck and Unlink on top of `repair`
    fn plan(
        runtime: &Runtime,
        graph: &RemoteGraph,
        repair: RepairPlan,
        timer: &mut CycleTimer,
    ) -> Result<Plan> {
        let exports = &runtime.exports;
        let live_after_repair =
            |index: ExportIndex| exports.object(index).or_else(|| repair.restores.get(&index).copied());

        // RootMark
        let mut root_marks = MarkBitmap::new(exports.len());
        for &index in &graph.roots {
            root_marks.mark(index.into());
        }
        timer.lap(Phase::RootMark.as_str());

        // LivenessCheck
        let mut records = Vec::new();
        records.try_reserve(graph.edges.len())?;
        for (key, successors) in &graph.edges {
            let Some(proxy) = runtime.imports.get(&runtime.heap, *key) else {
                continue;
            };
            let mut record = RepairRecord::default();
            for &index in successors {
                if let Some(obj) = live_after_repair(index) {
                    record.indexes.push(index);
                    record.objects.push(obj);
                }
            }
            if !record.indexes.is_empty() {
                records.push((proxy, record));
            }
        }
        timer.lap(Phase::LivenessCheck.as_str());

        // Unlink
        let mut unlink: Vec<(ExportIndex, ObjId)> = exports
            .live_objects()
            .chain(repair.restores.iter().map(|(&i, &obj)| (i, obj)))
            .filter(|(i, _)| !root_marks.is_marked((*i).into()))
            .collect();
        unlink.sort_unstable_by_key(|(i, _)| *i);
        let mut unlinked = FxHashMap::default();
        unlinked.try_reserve(unlink.len())?;
        unlinked.extend(unlink.iter().map(|&(i, obj)| (obj, i)));
        timer.lap(Phase::Unlink.as_str());

        Ok(Plan {
            repair,
            records,
            unlink,
            unlinked,
        })
    }

    /// Attach planned records, merging into any record a proxy still holds
    fn attach_records(runtime: &mut Runtime, records: Vec<(ObjId, RepairRecord)>) -> usize {
        let count = records.len();
        for (proxy, record) in records {
            let Some(data) = runtime.heap.proxy_mut(proxy) else {
                continue;
            };
            match data.record.as_mut() {
                None => data.record = Some(record),
                Some(existing) => {
                    for (index, obj) in record.indexes.into_iter().zip(record.objects) {
                        match existing.indexes.iter().position(|&i| i == index) {
                            Some(k) => existing.objects[k] = obj,
                            None => {
                                existing.indexes.push(index);
                                existing.objects.push(obj);
                            }
                        }
                    }
                }
            }
        }
        count
    }

    fn unlink(
        runtime: &mut Runtime,
        unlink: Vec<(ExportIndex, ObjId)>,
        unlinked: FxHashMap<ObjId, ExportIndex>,
    ) -> usize {
        for &(index, obj) in &unlink {
            runtime.exports.detach(index);
            log::trace!("{}: unlinked export slot {} ({})", runtime.name(), index, obj);
        }
        runtime.exports.set_unlinked(unlinked);
        unlink.len()
    }

    fn finish(
        &mut self,
        runtime: &Runtime,
        mut report: ManagerReport,
        timer: CycleTimer,
    ) -> Result<ManagerReport> {
        self.cycles += 1;
        report.phases = timer.into_phases();
        log::debug!(
            "{}: manager cycle {}: {} roots, {} records, {} unlinked, {} repaired",
            runtime.name(),
            self.cycles,
            report.roots,
            report.records,
            report.unlinked,
            report.repaired
        );
        Ok(report)
    }
}
