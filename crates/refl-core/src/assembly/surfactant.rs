use super::{AssemblyKind, AssemblyParts, DEFAULT_LAYER_COLLECTION_NAME};
use crate::domain::{AssemblyId, EntityKind, LayerId, ParameterId, ReflError, ReflResult};
use crate::layer::AreaPerMoleculeSpec;
use crate::parameter::Relation;
use crate::session::Session;
use tracing::debug;

pub const DEFAULT_SURFACTANT_NAME: &str = "EasySurfactantLayer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfactantRole {
    Tail,
    Head,
}

impl SurfactantRole {
    const fn index(self) -> usize {
        match self {
            Self::Tail => 0,
            Self::Head => 1,
        }
    }
}

/// Lipid monolayer: a tail and a head area-per-molecule layer. The head can
/// follow the tail's area per molecule and roughness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Surfactant {
    pub(crate) constrain_area_per_molecule: bool,
    pub(crate) conformal_roughness: bool,
}

impl Surfactant {
    pub fn constrain_area_per_molecule(&self) -> bool {
        self.constrain_area_per_molecule
    }

    pub fn conformal_roughness(&self) -> bool {
        self.conformal_roughness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    AreaPerMolecule,
    Roughness,
}

impl Session {
    pub fn create_surfactant_layer(
        &mut self,
        name: &str,
        tail: &LayerId,
        head: &LayerId,
    ) -> ReflResult<AssemblyId> {
        self.area_per_molecule_layer(tail)?;
        self.area_per_molecule_layer(head)?;
        if tail == head {
            return Err(ReflError::validation(
                "VALIDATION.SURFACTANT_STRUCTURE",
                "tail and head must be different layers",
            ));
        }
        let id = self.mint(EntityKind::SurfactantLayer);
        let layers_id = self.mint(EntityKind::LayerCollection);
        Ok(self.assemble_assembly(AssemblyParts {
            id,
            name: name.to_string(),
            layers_id,
            layers_name: DEFAULT_LAYER_COLLECTION_NAME.to_string(),
            populate_if_none: false,
            layers: vec![tail.clone(), head.clone()],
            kind: AssemblyKind::SurfactantLayer(Surfactant::default()),
        }))
    }

    /// DPPC: deuterated tails in air over a head group in D2O.
    pub fn create_default_surfactant_layer(&mut self) -> ReflResult<AssemblyId> {
        let air = self.create_material("Air", 0.0, 0.0)?;
        let tail = self.create_layer_area_per_molecule(
            &AreaPerMoleculeSpec::new("C32D64")
                .name("DPPC Tail")
                .thickness(16.0)
                .roughness(3.0)
                .solvent_fraction(0.0),
            &air,
        )?;
        let d2o = self.create_material("D2O", 6.36, 0.0)?;
        let head = self.create_layer_area_per_molecule(
            &AreaPerMoleculeSpec::new("C10H18NO8P")
                .name("DPPC Head")
                .thickness(10.0)
                .roughness(3.0)
                .solvent_fraction(0.2),
            &d2o,
        )?;
        self.create_surfactant_layer(DEFAULT_SURFACTANT_NAME, &tail, &head)
    }

    pub fn surfactant(&self, id: &AssemblyId) -> ReflResult<&Surfactant> {
        self.assembly(id)?.as_surfactant().ok_or_else(|| {
            ReflError::validation(
                "VALIDATION.NOT_A_SURFACTANT",
                format!("assembly '{}' is not a surfactant layer", id),
            )
        })
    }

    pub fn surfactant_layer(&self, id: &AssemblyId, role: SurfactantRole) -> ReflResult<&LayerId> {
        self.surfactant(id)?;
        self.assembly(id)?.layers.get(role.index())
    }

    pub fn set_constrain_area_per_molecule(&mut self, id: &AssemblyId, enabled: bool) -> ReflResult<()> {
        self.set_link(id, Link::AreaPerMolecule, enabled)
    }

    pub fn set_conformal_roughness(&mut self, id: &AssemblyId, enabled: bool) -> ReflResult<()> {
        self.set_link(id, Link::Roughness, enabled)
    }

    /// Writes through to the tail when the head value is tied to it.
    pub fn set_surfactant_area_per_molecule(
        &mut self,
        id: &AssemblyId,
        role: SurfactantRole,
        value: f64,
    ) -> ReflResult<()> {
        let tied = self.surfactant(id)?.constrain_area_per_molecule;
        let target = self.link_parameter(id, writable_role(role, tied), Link::AreaPerMolecule)?;
        self.set_parameter_value(&target, value)
    }

    pub fn set_surfactant_roughness(
        &mut self,
        id: &AssemblyId,
        role: SurfactantRole,
        value: f64,
    ) -> ReflResult<()> {
        let tied = self.surfactant(id)?.conformal_roughness;
        let target = self.link_parameter(id, writable_role(role, tied), Link::Roughness)?;
        self.set_parameter_value(&target, value)
    }

    fn link_parameter(&self, id: &AssemblyId, role: SurfactantRole, link: Link) -> ReflResult<ParameterId> {
        let layer = self.surfactant_layer(id, role)?;
        Ok(match link {
            Link::AreaPerMolecule => self.area_per_molecule_layer(layer)?.area_per_molecule.clone(),
            Link::Roughness => self.layer(layer)?.roughness.clone(),
        })
    }

    fn set_link(&mut self, id: &AssemblyId, link: Link, enabled: bool) -> ReflResult<()> {
        let current = *self.surfactant(id)?;
        let active = match link {
            Link::AreaPerMolecule => current.constrain_area_per_molecule,
            Link::Roughness => current.conformal_roughness,
        };
        if active == enabled {
            return Ok(());
        }
        let tail = self.link_parameter(id, SurfactantRole::Tail, link)?;
        let head = self.link_parameter(id, SurfactantRole::Head, link)?;
        if enabled {
            self.parameters
                .bind_constraint(&head, &[tail], Relation::Identity)?;
        } else {
            self.parameters.unbind(&head);
        }
        if let AssemblyKind::SurfactantLayer(surfactant) = &mut self.assembly_mut(id)?.kind {
            match link {
                Link::AreaPerMolecule => surfactant.constrain_area_per_molecule = enabled,
                Link::Roughness => surfactant.conformal_roughness = enabled,
            }
        }
        debug!(assembly = %id, link = ?link, enabled, "surfactant link toggled");
        self.flush();
        Ok(())
    }
}

fn writable_role(role: SurfactantRole, tied: bool) -> SurfactantRole {
    if tied { SurfactantRole::Tail } else { role }
}
