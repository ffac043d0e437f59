//! Geometry-derived bonding and non-bonded contact search.
//!
//! Both searches bucket atoms into a uniform cubic grid and only compare atoms
//! in neighbouring cells, so the work stays close to linear for molecules
//! without pathological clustering.

use super::config::{BondingParams, ContactParams};
use super::error::GeometryError;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::Bond;
use nalgebra::Point3;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument};

/// Padding added to every cell edge so that pairs sitting exactly at the
/// cutoff never straddle two non-adjacent cells.
const CELL_PADDING: f64 = 1e-3;
const MIN_CELL_SIZE: f64 = 0.1;

type Cell = (i32, i32, i32);

/// Uniform cubic cell index over atom positions.
#[derive(Debug)]
pub struct SpatialGrid {
    inv_cell_size: f64,
    cells: HashMap<Cell, Vec<usize>>,
}

impl SpatialGrid {
    /// Creates an empty grid. Cell sizes below 0.1 Å are raised to that floor.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            MIN_CELL_SIZE
        };
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, index: usize, position: &Point3<f64>) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push(index);
    }

    fn cell_of(&self, position: &Point3<f64>) -> Cell {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
            (position.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Indices stored in the 27 cells around `position`, own cell included.
    pub fn neighborhood(&self, position: &Point3<f64>) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy, cz) = self.cell_of(position);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
            .filter_map(move |(dx, dy, dz)| self.cells.get(&(cx + dx, cy + dy, cz + dz)))
            .flatten()
            .copied()
    }

    /// Every unordered pair `(i, j)` with `i < j` whose cells are adjacent.
    /// Each pair is reported once.
    pub fn candidate_pairs(&self, positions: &[Point3<f64>]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for members in self.cells.values() {
            for &i in members {
                for j in self.neighborhood(&positions[i]) {
                    if i < j {
                        pairs.push((i, j));
                    }
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A non-bonded pair closer than the scaled sum of van der Waals radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub first: usize,
    pub second: usize,
    pub distance: f64,
}

fn grid_over(molecule: &Molecule, cell_size: f64) -> SpatialGrid {
    let mut grid = SpatialGrid::new(cell_size);
    for (index, atom) in molecule.atoms().iter().enumerate() {
        if !atom.is_dummy() {
            grid.insert(index, &atom.position);
        }
    }
    grid
}

/// Bonds implied by the current geometry: `d <= scale * (r_i + r_j) + tolerance`
/// with covalent radii. Dummy atoms never bond. The result is sorted and
/// duplicate-free.
#[instrument(skip_all, name = "infer_bonds")]
pub fn infer_bonds(molecule: &Molecule, params: &BondingParams) -> Vec<Bond> {
    let atoms = molecule.atoms();
    let max_radius = atoms
        .iter()
        .filter(|a| !a.is_dummy())
        .map(|a| a.element.covalent_radius())
        .fold(0.0_f64, f64::max);
    let cell_size = 2.0 * max_radius * params.scale + params.tolerance + CELL_PADDING;
    let grid = grid_over(molecule, cell_size);
    let positions = molecule.positions();

    let mut bonds: Vec<Bond> = grid
        .candidate_pairs(&positions)
        .into_iter()
        .filter(|&(i, j)| {
            let cutoff = params.scale
                * (atoms[i].element.covalent_radius() + atoms[j].element.covalent_radius())
                + params.tolerance;
            (positions[i] - positions[j]).norm() <= cutoff
        })
        .map(|(i, j)| Bond::new(i, j))
        .collect();
    bonds.sort_unstable();
    bonds.dedup();

    debug!(atoms = atoms.len(), bonds = bonds.len(), "Inferred bonds from geometry");
    bonds
}

/// Re-infers the bond list, applies the molecule's bond overrides and stores
/// the result. Returns the number of bonds.
pub fn perceive_bonds(
    molecule: &mut Molecule,
    params: &BondingParams,
) -> Result<usize, GeometryError> {
    let inferred = infer_bonds(molecule, params);
    let bonds = molecule.overrides().apply(&inferred);
    let count = bonds.len();
    molecule.replace_bonds(bonds)?;
    Ok(count)
}

/// Atoms reachable from `atom` in at most `depth` bonds, excluding `atom`
/// itself, in ascending index order.
pub fn bonded_within(molecule: &Molecule, atom: usize, depth: usize) -> Vec<usize> {
    if atom >= molecule.len() || depth == 0 {
        return Vec::new();
    }
    let mut distance = vec![usize::MAX; molecule.len()];
    distance[atom] = 0;
    let mut queue = VecDeque::from([atom]);
    let mut reached = Vec::new();
    while let Some(current) = queue.pop_front() {
        if distance[current] == depth {
            continue;
        }
        for &next in molecule.neighbors(current) {
            if distance[next] == usize::MAX {
                distance[next] = distance[current] + 1;
                reached.push(next);
                queue.push_back(next);
            }
        }
    }
    reached.sort_unstable();
    reached
}

/// Non-bonded pairs with `d < scale * (vdw_i + vdw_j) + tolerance`, skipping
/// pairs separated by at most `exclusion_depth` bonds. Sorted by atom pair.
#[instrument(skip_all, name = "find_close_contacts")]
pub fn find_close_contacts(molecule: &Molecule, params: &ContactParams) -> Vec<Contact> {
    let atoms = molecule.atoms();
    let max_radius = atoms
        .iter()
        .filter(|a| !a.is_dummy())
        .map(|a| a.element.vdw_radius())
        .fold(0.0_f64, f64::max);
    let cell_size = 2.0 * max_radius * params.scale + params.tolerance + CELL_PADDING;
    let grid = grid_over(molecule, cell_size);
    let positions = molecule.positions();

    let mut excluded: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut contacts = Vec::new();
    for (i, j) in grid.candidate_pairs(&positions) {
        let distance = (positions[i] - positions[j]).norm();
        let cutoff = params.scale
            * (atoms[i].element.vdw_radius() + atoms[j].element.vdw_radius())
            + params.tolerance;
        if distance >= cutoff {
            continue;
        }
        let near = excluded
            .entry(i)
            .or_insert_with(|| bonded_within(molecule, i, params.exclusion_depth));
        if near.binary_search(&j).is_ok() {
            continue;
        }
        contacts.push(Contact {
            first: i,
            second: j,
            distance,
        });
    }

    debug!(contacts = contacts.len(), "Close-contact search finished");
    contacts
}
