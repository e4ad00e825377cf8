use super::{
    AssemblyRecord, CollectionRecord, LayerRecord, MaterialCollectionRecord, MaterialRecord,
    ModelCollectionRecord, ModelRecord, ParameterRecord, SampleRecord,
};
use crate::assembly::{Assembly, AssemblyKind};
use crate::domain::{
    AssemblyId, CollectionId, LayerId, MaterialId, ModelId, ParameterId, ReflResult, SampleId,
};
use crate::layer::LayerKind;
use crate::material::{MaterialKind, MixtureRole};
use crate::session::Session;

impl Session {
    pub(crate) fn parameter_record(&self, id: &ParameterId) -> ReflResult<ParameterRecord> {
        Ok(ParameterRecord::from_parameter(self.parameter(id)?))
    }

    pub(crate) fn material_record(&self, id: &MaterialId) -> ReflResult<MaterialRecord> {
        let material = self.material(id)?;
        let name = material.name.clone();
        let unique_name = Some(id.to_string());
        let sld = self.parameter_record(&material.sld)?;
        let isld = self.parameter_record(&material.isld)?;
        Ok(match &material.kind {
            MaterialKind::Plain => MaterialRecord::Material {
                name,
                unique_name,
                sld,
                isld,
            },
            MaterialKind::Mixture(mixture) => {
                let material_a = Box::new(self.material_record(&mixture.material_a)?);
                let material_b = Box::new(self.material_record(&mixture.material_b)?);
                let fraction = self.parameter_record(&mixture.fraction)?;
                match mixture.role {
                    MixtureRole::Mixture => MaterialRecord::MaterialMixture {
                        name,
                        unique_name,
                        material_a,
                        material_b,
                        fraction,
                        sld,
                        isld,
                    },
                    MixtureRole::Solvated => MaterialRecord::MaterialSolvated {
                        name,
                        unique_name,
                        material: material_a,
                        solvent: material_b,
                        solvent_fraction: fraction,
                        sld,
                        isld,
                    },
                }
            }
            MaterialKind::Density(density) => MaterialRecord::MaterialDensity {
                name,
                unique_name,
                chemical_structure: density.chemical_structure.clone(),
                density: self.parameter_record(&density.density)?,
                scattering_length_real: self.parameter_record(&density.scattering_length_real)?,
                scattering_length_imag: self.parameter_record(&density.scattering_length_imag)?,
                molecular_weight: self.parameter_record(&density.molecular_weight)?,
                sld,
                isld,
            },
        })
    }

    pub(crate) fn layer_record(&self, id: &LayerId) -> ReflResult<LayerRecord> {
        let layer = self.layer(id)?;
        let name = layer.name.clone();
        let unique_name = Some(id.to_string());
        let material = self.material_record(&layer.material)?;
        let thickness = self.parameter_record(&layer.thickness)?;
        let roughness = self.parameter_record(&layer.roughness)?;
        Ok(match &layer.kind {
            LayerKind::Plain => LayerRecord::Layer {
                name,
                unique_name,
                material,
                thickness,
                roughness,
            },
            LayerKind::AreaPerMolecule(film) => LayerRecord::LayerAreaPerMolecule {
                name,
                unique_name,
                molecular_formula: film.molecular_formula.clone(),
                thickness,
                roughness,
                area_per_molecule: self.parameter_record(&film.area_per_molecule)?,
                scattering_length_real: self.parameter_record(&film.scattering_length_real)?,
                scattering_length_imag: self.parameter_record(&film.scattering_length_imag)?,
                material,
            },
        })
    }

    pub(crate) fn assembly_record(&self, id: &AssemblyId) -> ReflResult<AssemblyRecord> {
        let assembly = self.assembly(id)?;
        let name = assembly.name.clone();
        let unique_name = Some(id.to_string());
        let layers = self.layer_collection_record(assembly)?;
        Ok(match &assembly.kind {
            AssemblyKind::Multilayer => AssemblyRecord::Multilayer {
                name,
                unique_name,
                layers,
            },
            AssemblyKind::RepeatingMultilayer { repetitions } => {
                AssemblyRecord::RepeatingMultilayer {
                    name,
                    unique_name,
                    layers,
                    repetitions: self.parameter_record(repetitions)?,
                }
            }
            AssemblyKind::SurfactantLayer(surfactant) => AssemblyRecord::SurfactantLayer {
                name,
                unique_name,
                layers,
                constrain_area_per_molecule: surfactant.constrain_area_per_molecule,
                conformal_roughness: surfactant.conformal_roughness,
            },
        })
    }

    fn layer_collection_record(&self, assembly: &Assembly) -> ReflResult<CollectionRecord<LayerRecord>> {
        Ok(CollectionRecord {
            name: assembly.layers.name().to_string(),
            unique_name: Some(assembly.layers_id.to_string()),
            populate_if_none: assembly.layers.populate_if_none(),
            data: assembly
                .layers
                .iter()
                .map(|layer| self.layer_record(layer))
                .collect::<ReflResult<_>>()?,
        })
    }

    pub(crate) fn sample_record(&self, id: &SampleId) -> ReflResult<SampleRecord> {
        let sample = self.sample(id)?;
        Ok(CollectionRecord {
            name: sample.assemblies.name().to_string(),
            unique_name: Some(id.to_string()),
            populate_if_none: sample.assemblies.populate_if_none(),
            data: sample
                .assemblies
                .iter()
                .map(|assembly| self.assembly_record(assembly))
                .collect::<ReflResult<_>>()?,
        })
    }

    pub(crate) fn model_record(&self, id: &ModelId) -> ReflResult<ModelRecord> {
        let model = self.model(id)?;
        Ok(ModelRecord {
            name: model.name.clone(),
            unique_name: Some(id.to_string()),
            scale: self.parameter_record(&model.scale)?,
            background: self.parameter_record(&model.background)?,
            sample: self.sample_record(&model.sample)?,
            resolution_function: model.resolution.clone(),
            interface: model.interface.clone(),
        })
    }

    pub(crate) fn material_collection_record(
        &self,
        id: &CollectionId,
    ) -> ReflResult<MaterialCollectionRecord> {
        let collection = self.material_collection(id)?;
        Ok(CollectionRecord {
            name: collection.name().to_string(),
            unique_name: Some(id.to_string()),
            populate_if_none: collection.populate_if_none(),
            data: collection
                .iter()
                .map(|material| self.material_record(material))
                .collect::<ReflResult<_>>()?,
        })
    }

    pub(crate) fn model_collection_record(&self, id: &CollectionId) -> ReflResult<ModelCollectionRecord> {
        let collection = self.model_collection(id)?;
        Ok(CollectionRecord {
            name: collection.name().to_string(),
            unique_name: Some(id.to_string()),
            populate_if_none: collection.populate_if_none(),
            data: collection
                .iter()
                .map(|model| self.model_record(model))
                .collect::<ReflResult<_>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::serialization::{AssemblyRecord, LayerRecord, MaterialRecord};
    use crate::session::Session;
    use serde_json::json;

    #[test]
    fn plain_material_exports_both_sld_parts() {
        let mut session = Session::new();
        let boron = session.create_material("Boron", 6.908, -0.278).unwrap();
        let value = session.material_as_dict(&boron).unwrap();
        assert_eq!(value["kind"], json!("material"));
        assert_eq!(value["name"], json!("Boron"));
        assert_eq!(value["unique_name"], json!(boron.as_str()));
        assert_eq!(value["sld"]["value"], json!(6.908));
        assert_eq!(value["isld"]["value"], json!(-0.278));
        assert_eq!(value["sld"]["min"], json!("-inf"));
    }

    #[test]
    fn shared_materials_are_written_under_one_identifier() {
        let mut session = Session::new();
        let d2o = session.create_material("D2O", 6.36, 0.0).unwrap();
        let top = session.create_layer("top", &d2o, 10.0, 3.0).unwrap();
        let bottom = session.create_layer("bottom", &d2o, 20.0, 3.0).unwrap();
        let stack = session.create_multilayer("stack", &[top, bottom]).unwrap();

        let record = session.assembly_record(&stack).unwrap();
        let AssemblyRecord::Multilayer { layers, .. } = record else {
            panic!("expected a multilayer record");
        };
        let materials: Vec<Option<String>> = layers
            .data
            .iter()
            .map(|layer| match layer {
                LayerRecord::Layer { material, .. } => material.unique_name().map(str::to_string),
                LayerRecord::LayerAreaPerMolecule { .. } => None,
            })
            .collect();
        assert_eq!(materials, vec![Some(d2o.to_string()), Some(d2o.to_string())]);
    }

    #[test]
    fn molecular_films_export_their_solvated_material() {
        let mut session = Session::new();
        let film = session.create_default_layer_area_per_molecule().unwrap();
        let LayerRecord::LayerAreaPerMolecule {
            molecular_formula,
            material,
            ..
        } = session.layer_record(&film).unwrap()
        else {
            panic!("expected an area-per-molecule record");
        };
        assert_eq!(molecular_formula, "C10H18NO8P");
        let MaterialRecord::MaterialSolvated { material, solvent, .. } = material else {
            panic!("expected a solvated material");
        };
        assert_eq!(material.name(), "C10H18NO8P");
        assert_eq!(solvent.name(), "D2O");
    }

    #[test]
    fn model_records_carry_resolution_and_interface() {
        let mut session = Session::new();
        let model = session.create_default_model().unwrap();
        let value = session.model_as_dict(&model).unwrap();
        assert_eq!(
            value["resolution_function"],
            json!({"smearing": "PercentageFhwm", "constant": 5.0})
        );
        assert_eq!(value["interface"], json!(null));
        assert_eq!(value["sample"]["data"].as_array().unwrap().len(), 2);
        assert_eq!(value["sample"]["populate_if_none"], json!(true));
    }
}
