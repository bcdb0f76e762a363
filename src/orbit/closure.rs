//! The orbit closure engine with Schreier forest, SCCs and multipliers.

use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;

use crate::cache::{ElementCache, TrivialCache};
use crate::element::MonoidElement;
use crate::error::KoniecznyError;
use crate::invariants::{AuditInvariants, InvariantReport};
use crate::orbit::action::Action;
use crate::orbit::graph::{gabow_scc, NO_EDGE};

/// How a non-seed point was first reached: applying `generator` to the
/// point at `parent`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SchreierEdge {
    /// Index of the generator applied.
    pub generator: usize,
    /// Index of the source point.
    pub parent: usize,
}

#[derive(Debug)]
struct SccData<E> {
    ids: Vec<usize>,
    comps: Vec<Vec<usize>>,
    to_root: Vec<E>,
    from_root: Vec<E>,
}

/// The orbit of a set of seed points under generators and an action.
///
/// After [`run`](Self::run) the orbit is closed, the SCC decomposition
/// of the action digraph is available, and every point carries Schreier
/// multipliers to and from its component's root.
///
/// ```
/// use konieczny::element::Transformation;
/// use konieczny::orbit::{OnTuples, Orbit};
///
/// let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
/// o.add_seed(vec![0, 1]);
/// o.add_generator(Transformation::from_images([1, 2, 0]).unwrap()).unwrap();
/// o.run().unwrap();
/// assert_eq!(o.len(), 3);
/// assert_eq!(o.position(&vec![1, 2]), Some(1));
/// ```
#[derive(Debug)]
pub struct Orbit<E, A>
where
    E: MonoidElement,
    A: Action<E>,
{
    gens: Vec<E>,
    points: Vec<A::Point>,
    index: HashMap<A::Point, usize>,
    /// Row-major edge table, one row of `gens.len()` targets per
    /// processed point; `NO_EDGE` marks rejected targets.
    edges: Vec<usize>,
    forest: Vec<Option<SchreierEdge>>,
    scc: Option<SccData<E>>,
    ran: bool,
    finished: bool,
    point_scratch: TrivialCache<A::Point>,
    element_cache: ElementCache<E>,
    _action: PhantomData<A>,
}

impl<E, A> Default for Orbit<E, A>
where
    E: MonoidElement,
    A: Action<E>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, A> Orbit<E, A>
where
    E: MonoidElement,
    A: Action<E>,
{
    /// An empty orbit with no seeds or generators.
    pub fn new() -> Self {
        Self {
            gens: Vec::new(),
            points: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            forest: Vec::new(),
            scc: None,
            ran: false,
            finished: false,
            point_scratch: TrivialCache::default(),
            element_cache: ElementCache::new(),
            _action: PhantomData,
        }
    }

    /// Push a seed point and return its index; a point already in the
    /// orbit keeps its existing index. Marks the orbit unfinished.
    pub fn add_seed(&mut self, seed: A::Point) -> usize {
        if let Some(&i) = self.index.get(&seed) {
            return i;
        }
        let i = self.points.len();
        self.index.insert(seed.clone(), i);
        self.points.push(seed);
        self.forest.push(None);
        self.finished = false;
        self.scc = None;
        i
    }

    /// Insert a generator.
    ///
    /// Fails with [`KoniecznyError::Frozen`] once the orbit has been
    /// run; [`reset`](Self::reset) lifts the freeze.
    pub fn add_generator(&mut self, g: E) -> Result<(), KoniecznyError> {
        if self.ran {
            return Err(KoniecznyError::Frozen);
        }
        self.gens.push(g);
        Ok(())
    }

    /// Discard all points and derived data, keeping the generators.
    pub fn reset(&mut self) {
        self.points.clear();
        self.index.clear();
        self.edges.clear();
        self.forest.clear();
        self.scc = None;
        self.ran = false;
        self.finished = false;
    }

    /// Close the orbit to a fixed point and compute SCCs and
    /// multipliers.
    ///
    /// Fails with [`KoniecznyError::EmptyGenerators`] when no
    /// generators were added. Idempotent once finished.
    pub fn run(&mut self) -> Result<(), KoniecznyError> {
        self.run_filtered(|_| true, |_| {})
    }

    /// Closure with an admission gate: points failing `admit` are
    /// handed to `reject` instead of being expanded, and their edge
    /// slots stay empty. Used by the graded wrapper.
    pub(crate) fn run_filtered<F, R>(
        &mut self,
        mut admit: F,
        mut reject: R,
    ) -> Result<(), KoniecznyError>
    where
        F: FnMut(&A::Point) -> bool,
        R: FnMut(&A::Point),
    {
        if self.finished {
            return Ok(());
        }
        if self.gens.is_empty() {
            return Err(KoniecznyError::EmptyGenerators);
        }
        self.ran = true;
        let stride = self.gens.len();
        let mut scratch = self.point_scratch.acquire();

        // Rows exist exactly for processed points, so closure resumes
        // after newly added seeds.
        let mut i = self.edges.len() / stride;
        while i < self.points.len() {
            for gi in 0..stride {
                A::apply(&mut scratch, &self.points[i], &self.gens[gi]);
                let target = match self.index.get(&scratch).copied() {
                    Some(j) => j,
                    None if admit(&scratch) => {
                        let j = self.points.len();
                        self.index.insert(scratch.clone(), j);
                        self.points.push(scratch.clone());
                        self.forest.push(Some(SchreierEdge {
                            generator: gi,
                            parent: i,
                        }));
                        j
                    }
                    None => {
                        reject(&scratch);
                        NO_EDGE
                    }
                };
                self.edges.push(target);
            }
            i += 1;
        }
        self.point_scratch.release(scratch);
        log::debug!("orbit closed with {} points", self.points.len());

        self.compute_sccs()?;
        self.finished = true;
        crate::audit_invariants!(*self, "orbit after run");
        Ok(())
    }

    fn working_identity(&self) -> Result<E, KoniecznyError> {
        let deg = self
            .gens
            .iter()
            .map(MonoidElement::degree)
            .max()
            .ok_or(KoniecznyError::EmptyGenerators)?;
        E::identity_of_degree(deg)
    }

    fn compute_sccs(&mut self) -> Result<(), KoniecznyError> {
        let stride = self.gens.len();
        let n = self.points.len();
        let (ids, comps) = gabow_scc(n, stride, &self.edges);

        let identity = self.working_identity()?;
        if self.element_cache.held() == 0 {
            self.element_cache.push(&identity, 1);
        }
        let mut scratch = self.element_cache.acquire()?;

        let mut from_root = vec![E::default(); n];
        let mut to_root = vec![E::default(); n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::new();

        // Forward BFS inside each component gives the multipliers from
        // the root; edges are taken in generator-index order.
        for comp in &comps {
            let root = comp[0];
            from_root[root] = identity.clone();
            visited[root] = true;
            queue.push_back(root);
            while let Some(u) = queue.pop_front() {
                for gi in 0..stride {
                    let w = self.edges[u * stride + gi];
                    if w != NO_EDGE && ids[w] == ids[u] && !visited[w] {
                        visited[w] = true;
                        A::chain(&mut scratch, &from_root[u], &self.gens[gi], 0);
                        from_root[w] = scratch.clone();
                        queue.push_back(w);
                    }
                }
            }
        }

        // A BFS over the reversed in-component edges gives the
        // multipliers back to the root: every point of an SCC admits a
        // backward path by definition.
        let mut reverse: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
        for u in 0..n {
            for gi in 0..stride {
                let w = self.edges[u * stride + gi];
                if w != NO_EDGE && ids[w] == ids[u] {
                    reverse[w].push((u, gi));
                }
            }
        }
        visited.iter_mut().for_each(|v| *v = false);
        for comp in &comps {
            let root = comp[0];
            to_root[root] = identity.clone();
            visited[root] = true;
            queue.push_back(root);
            while let Some(w) = queue.pop_front() {
                for &(u, gi) in &reverse[w] {
                    if !visited[u] {
                        visited[u] = true;
                        // u reaches the root by the edge into w, then
                        // w's own path.
                        A::chain(&mut scratch, &self.gens[gi], &to_root[w], 0);
                        to_root[u] = scratch.clone();
                        queue.push_back(u);
                    }
                }
            }
        }
        self.element_cache.release(scratch)?;

        self.scc = Some(SccData {
            ids,
            comps,
            to_root,
            from_root,
        });
        Ok(())
    }

    /// Number of points currently enumerated.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the orbit holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether [`run`](Self::run) has completed since the last change.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The point at index `i`.
    #[inline]
    pub fn at(&self, i: usize) -> &A::Point {
        &self.points[i]
    }

    /// The index of `pt`, or `None` when it is not in the orbit.
    #[inline]
    pub fn position(&self, pt: &A::Point) -> Option<usize> {
        self.index.get(pt).copied()
    }

    /// Iterate over the points in insertion order.
    pub fn points(&self) -> impl Iterator<Item = &A::Point> {
        self.points.iter()
    }

    /// The generators, in insertion order.
    #[inline]
    pub fn generators(&self) -> &[E] {
        &self.gens
    }

    /// The Schreier edge of point `i` (`None` for seeds).
    pub fn schreier_edge(&self, i: usize) -> Option<SchreierEdge> {
        self.forest[i]
    }

    fn scc_data(&self) -> Result<&SccData<E>, KoniecznyError> {
        self.scc.as_ref().ok_or(KoniecznyError::NotComputed)
    }

    /// The SCC id of point `i`. Ids increase in completion order.
    pub fn scc_id(&self, i: usize) -> Result<usize, KoniecznyError> {
        Ok(self.scc_data()?.ids[i])
    }

    /// Number of strongly connected components.
    pub fn number_of_sccs(&self) -> Result<usize, KoniecznyError> {
        Ok(self.scc_data()?.comps.len())
    }

    /// Member indices of component `id`, in increasing point order.
    pub fn scc_members(&self, id: usize) -> Result<&[usize], KoniecznyError> {
        Ok(&self.scc_data()?.comps[id])
    }

    /// The root index of component `id` (its first member).
    pub fn root_of_scc(&self, id: usize) -> Result<usize, KoniecznyError> {
        Ok(self.scc_data()?.comps[id][0])
    }

    /// The multiplier carrying point `i` to its component's root.
    pub fn multiplier_to_scc_root(&self, i: usize) -> Result<&E, KoniecznyError> {
        Ok(&self.scc_data()?.to_root[i])
    }

    /// The multiplier carrying the component's root to point `i`.
    pub fn multiplier_from_scc_root(&self, i: usize) -> Result<&E, KoniecznyError> {
        Ok(&self.scc_data()?.from_root[i])
    }

    /// The element carrying point `i`'s seed to point `i`, read off the
    /// Schreier forest.
    pub fn schreier_element(&self, i: usize) -> Result<E, KoniecznyError> {
        let mut path = Vec::new();
        let mut j = i;
        while let Some(edge) = self.forest[j] {
            path.push(edge.generator);
            j = edge.parent;
        }
        let mut out = self.working_identity()?;
        let mut tmp = E::default();
        for &gi in path.iter().rev() {
            A::chain(&mut tmp, &out, &self.gens[gi], 0);
            std::mem::swap(&mut out, &mut tmp);
        }
        Ok(out)
    }
}

impl<E, A> AuditInvariants for Orbit<E, A>
where
    E: MonoidElement,
    A: Action<E>,
{
    fn audit_invariants(&self, report: &mut InvariantReport) {
        for (i, pt) in self.points.iter().enumerate() {
            report.require(self.position(pt) == Some(i), || {
                format!("position of point {i} is not {i}")
            });
        }
        let stride = self.gens.len();
        let mut scratch = self.point_scratch.acquire();
        let rows = if stride == 0 {
            0
        } else {
            self.edges.len() / stride
        };
        for i in 0..rows {
            for gi in 0..stride {
                let j = self.edges[i * stride + gi];
                if j == NO_EDGE {
                    continue;
                }
                A::apply(&mut scratch, &self.points[i], &self.gens[gi]);
                report.require(scratch == self.points[j], || {
                    format!("edge ({i}, {gi}) does not reach its target")
                });
            }
        }
        for (i, edge) in self.forest.iter().enumerate() {
            if let Some(SchreierEdge { generator, parent }) = *edge {
                A::apply(&mut scratch, &self.points[parent], &self.gens[generator]);
                report.require(scratch == self.points[i], || {
                    format!("schreier edge of point {i} is inconsistent")
                });
            }
        }
        if let Some(scc) = &self.scc {
            let mut seen = vec![false; self.points.len()];
            for (id, comp) in scc.comps.iter().enumerate() {
                for &i in comp {
                    let misfiled = scc.ids[i] != id || std::mem::replace(&mut seen[i], true);
                    report.require(!misfiled, || {
                        format!("point {i} is misfiled in component {id}")
                    });
                }
            }
            report.require(seen.iter().all(|&s| s), || {
                "a point belongs to no component".into()
            });
            for i in 0..rows {
                for gi in 0..stride {
                    let j = self.edges[i * stride + gi];
                    report.require(j == NO_EDGE || scc.ids[j] <= scc.ids[i], || {
                        format!("edge ({i}, {gi}) reaches a later-completing component")
                    });
                }
            }
            for i in 0..self.points.len() {
                let root = scc.comps[scc.ids[i]][0];
                A::apply(&mut scratch, &self.points[i], &scc.to_root[i]);
                report.require(scratch == self.points[root], || {
                    format!("to-root multiplier of point {i} is wrong")
                });
                A::apply(&mut scratch, &self.points[root], &scc.from_root[i]);
                report.require(scratch == self.points[i], || {
                    format!("from-root multiplier of point {i} is wrong")
                });
            }
        }
        self.point_scratch.release(scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Transformation;
    use crate::orbit::action::{OnImages, OnTuples};

    fn t(v: &[u8]) -> Transformation {
        Transformation::new(v.to_vec()).unwrap()
    }

    #[test]
    fn closure_of_an_image_orbit() {
        let mut o: Orbit<Transformation, OnImages> = Orbit::new();
        let id = Transformation::identity_of_degree(3).unwrap();
        o.add_seed(Transformation::lambda_of(&id).unwrap());
        o.add_generator(t(&[1, 2, 0])).unwrap();
        o.add_generator(t(&[0, 0, 2])).unwrap();
        o.run().unwrap();
        // Images reachable from {0,1,2}: itself, {0,2} and its rotations,
        // {0}, {1}, {2}.
        assert_eq!(o.len(), 7);
        o.checked_invariants().unwrap();
    }

    #[test]
    fn add_generator_after_run_is_frozen() {
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        o.add_seed(vec![0]);
        o.add_generator(t(&[1, 0])).unwrap();
        o.run().unwrap();
        assert_eq!(
            o.add_generator(t(&[0, 1])).unwrap_err(),
            KoniecznyError::Frozen
        );
        o.reset();
        o.add_generator(t(&[0, 1])).unwrap();
    }

    #[test]
    fn duplicate_seed_keeps_its_index() {
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        assert_eq!(o.add_seed(vec![0, 1]), 0);
        assert_eq!(o.add_seed(vec![1, 0]), 1);
        assert_eq!(o.add_seed(vec![0, 1]), 0);
        assert_eq!(o.len(), 2);
    }

    #[test]
    fn run_without_generators_fails() {
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        o.add_seed(vec![0]);
        assert_eq!(o.run().unwrap_err(), KoniecznyError::EmptyGenerators);
    }

    #[test]
    fn scc_queries_before_run_are_not_computed() {
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        o.add_seed(vec![0]);
        assert_eq!(o.scc_id(0).unwrap_err(), KoniecznyError::NotComputed);
        assert_eq!(
            o.multiplier_to_scc_root(0).unwrap_err(),
            KoniecznyError::NotComputed
        );
    }

    #[test]
    fn multipliers_move_points_as_promised() {
        // Orbit of (0,1) under the symmetric group on 4 points.
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        o.add_seed(vec![0, 1]);
        o.add_generator(t(&[1, 0, 2, 3])).unwrap();
        o.add_generator(t(&[1, 2, 3, 0])).unwrap();
        o.run().unwrap();
        assert_eq!(o.len(), 12);
        assert_eq!(o.number_of_sccs().unwrap(), 1);

        let root = o.root_of_scc(0).unwrap();
        let mut dst = Vec::new();
        for i in 0..o.len() {
            OnTuples::apply(&mut dst, o.at(i), o.multiplier_to_scc_root(i).unwrap());
            assert_eq!(&dst, o.at(root));
            OnTuples::apply(&mut dst, o.at(root), o.multiplier_from_scc_root(i).unwrap());
            assert_eq!(&dst, o.at(i));
        }
    }

    #[test]
    fn schreier_elements_reconstruct_points() {
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        o.add_seed(vec![0, 1, 2]);
        o.add_generator(t(&[1, 0, 2, 3, 4])).unwrap();
        o.add_generator(t(&[1, 2, 3, 4, 0])).unwrap();
        o.run().unwrap();
        let seed = o.at(0).clone();
        let mut dst = Vec::new();
        for i in 0..o.len() {
            let m = o.schreier_element(i).unwrap();
            OnTuples::apply(&mut dst, &seed, &m);
            assert_eq!(&dst, o.at(i));
        }
    }

    #[test]
    fn seeds_after_run_resume_cleanly() {
        let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
        o.add_seed(vec![0]);
        o.add_generator(t(&[0, 2, 1])).unwrap();
        o.run().unwrap();
        assert_eq!(o.len(), 1);
        o.add_seed(vec![1]);
        assert!(!o.is_finished());
        o.run().unwrap();
        // {1} and its image {2} join the fixed seed {0}.
        assert_eq!(o.len(), 3);
        assert_eq!(o.position(&vec![2]), Some(2));
        o.checked_invariants().unwrap();
    }
}
