//! Standalone named collections of materials and of models.

use crate::collection::{Collection, initial_items};
use crate::domain::{CollectionId, EntityKind, MaterialId, ModelId, ReflResult};
use crate::serialization::{Importer, MaterialCollectionRecord, ModelCollectionRecord};
use crate::session::{Session, missing};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_MATERIAL_COLLECTION_NAME: &str = "EasyMaterials";
pub const DEFAULT_MODEL_COLLECTION_NAME: &str = "EasyModels";

impl Session {
    pub fn create_material_collection(
        &mut self,
        name: &str,
        materials: &[MaterialId],
    ) -> ReflResult<CollectionId> {
        self.build_material_collection(name, materials, false)
    }

    /// Air, D2O and Si.
    pub fn create_default_material_collection(&mut self) -> ReflResult<CollectionId> {
        self.build_material_collection(DEFAULT_MATERIAL_COLLECTION_NAME, &[], true)
    }

    pub(crate) fn build_material_collection(
        &mut self,
        name: &str,
        materials: &[MaterialId],
        populate_if_none: bool,
    ) -> ReflResult<CollectionId> {
        for material in materials {
            self.material(material)?;
        }
        let materials = initial_items(materials, populate_if_none, || {
            Ok(vec![
                self.create_material("Air", 0.0, 0.0)?,
                self.create_material("D2O", 6.36, 0.0)?,
                self.create_material("Si", 2.07, 0.0)?,
            ])
        })?;
        let id = self.mint(EntityKind::MaterialCollection);
        Ok(self.assemble_material_collection(id, name.to_string(), populate_if_none, materials))
    }

    pub(crate) fn assemble_material_collection(
        &mut self,
        id: String,
        name: String,
        populate_if_none: bool,
        materials: Vec<MaterialId>,
    ) -> CollectionId {
        for material in &materials {
            self.registry.link(&id, material.as_str());
        }
        let id = CollectionId::new(id);
        self.material_collections
            .insert(id.clone(), Collection::with_items(name, populate_if_none, materials));
        id
    }

    pub fn material_collection(&self, id: &CollectionId) -> ReflResult<&Collection<MaterialId>> {
        self.material_collections
            .get(id)
            .ok_or_else(|| missing("material collection", id))
    }

    fn material_collection_mut(&mut self, id: &CollectionId) -> ReflResult<&mut Collection<MaterialId>> {
        self.material_collections
            .get_mut(id)
            .ok_or_else(|| missing("material collection", id))
    }

    /// Appends `material`, or a new default material.
    pub fn add_material(&mut self, id: &CollectionId, material: Option<&MaterialId>) -> ReflResult<MaterialId> {
        self.material_collection(id)?;
        let material = match material {
            Some(material) => {
                self.material(material)?;
                material.clone()
            }
            None => self.create_default_material()?,
        };
        self.material_collection_mut(id)?.append(material.clone());
        self.registry.link(id.as_str(), material.as_str());
        debug!(collection = %id, material = %material, "material added");
        Ok(material)
    }

    /// Removes the material at `index`, releasing it when nothing else
    /// references it.
    pub fn remove_material(&mut self, id: &CollectionId, index: usize) -> ReflResult<MaterialId> {
        let material = self.material_collection_mut(id)?.remove(index)?;
        self.registry.unlink(id.as_str(), material.as_str());
        if !self.registry.has_parents(material.as_str()) {
            self.release_material(&material);
        }
        debug!(collection = %id, material = %material, index, "material removed");
        Ok(material)
    }

    pub fn move_material_up(&mut self, id: &CollectionId, index: usize) -> ReflResult<()> {
        self.material_collection_mut(id)?.move_up(index)?;
        Ok(())
    }

    pub fn move_material_down(&mut self, id: &CollectionId, index: usize) -> ReflResult<()> {
        self.material_collection_mut(id)?.move_down(index)?;
        Ok(())
    }

    pub fn duplicate_collection_material(&mut self, id: &CollectionId, index: usize) -> ReflResult<MaterialId> {
        let material = self.material_collection(id)?.get(index)?.clone();
        let copy = self.duplicate_material(&material)?;
        self.add_material(id, Some(&copy))
    }

    pub fn material_collection_as_dict(&self, id: &CollectionId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.material_collection_record(id)?)?)
    }

    pub fn material_collection_from_dict(&mut self, value: &Value) -> ReflResult<CollectionId> {
        let record: MaterialCollectionRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_material_collection(&record),
            |importer| importer.import_material_collection(&record),
        )
    }

    pub fn create_model_collection(&mut self, name: &str, models: &[ModelId]) -> ReflResult<CollectionId> {
        self.build_model_collection(name, models, false)
    }

    /// One default model.
    pub fn create_default_model_collection(&mut self) -> ReflResult<CollectionId> {
        self.build_model_collection(DEFAULT_MODEL_COLLECTION_NAME, &[], true)
    }

    pub(crate) fn build_model_collection(
        &mut self,
        name: &str,
        models: &[ModelId],
        populate_if_none: bool,
    ) -> ReflResult<CollectionId> {
        for model in models {
            self.model(model)?;
        }
        let models = initial_items(models, populate_if_none, || Ok(vec![self.create_default_model()?]))?;
        let id = self.mint(EntityKind::ModelCollection);
        Ok(self.assemble_model_collection(id, name.to_string(), populate_if_none, models))
    }

    pub(crate) fn assemble_model_collection(
        &mut self,
        id: String,
        name: String,
        populate_if_none: bool,
        models: Vec<ModelId>,
    ) -> CollectionId {
        for model in &models {
            self.registry.link(&id, model.as_str());
        }
        let id = CollectionId::new(id);
        self.model_collections
            .insert(id.clone(), Collection::with_items(name, populate_if_none, models));
        id
    }

    pub fn model_collection(&self, id: &CollectionId) -> ReflResult<&Collection<ModelId>> {
        self.model_collections
            .get(id)
            .ok_or_else(|| missing("model collection", id))
    }

    fn model_collection_mut(&mut self, id: &CollectionId) -> ReflResult<&mut Collection<ModelId>> {
        self.model_collections
            .get_mut(id)
            .ok_or_else(|| missing("model collection", id))
    }

    /// Appends `model`, or a new default model.
    pub fn add_model(&mut self, id: &CollectionId, model: Option<&ModelId>) -> ReflResult<ModelId> {
        self.model_collection(id)?;
        let model = match model {
            Some(model) => {
                self.model(model)?;
                model.clone()
            }
            None => self.create_default_model()?,
        };
        self.model_collection_mut(id)?.append(model.clone());
        self.registry.link(id.as_str(), model.as_str());
        debug!(collection = %id, model = %model, "model added");
        Ok(model)
    }

    pub fn remove_model(&mut self, id: &CollectionId, index: usize) -> ReflResult<ModelId> {
        let model = self.model_collection_mut(id)?.remove(index)?;
        self.registry.unlink(id.as_str(), model.as_str());
        self.release_model(&model);
        debug!(collection = %id, model = %model, index, "model removed");
        Ok(model)
    }

    pub fn move_model_up(&mut self, id: &CollectionId, index: usize) -> ReflResult<()> {
        self.model_collection_mut(id)?.move_up(index)?;
        Ok(())
    }

    pub fn move_model_down(&mut self, id: &CollectionId, index: usize) -> ReflResult<()> {
        self.model_collection_mut(id)?.move_down(index)?;
        Ok(())
    }

    pub fn duplicate_collection_model(&mut self, id: &CollectionId, index: usize) -> ReflResult<ModelId> {
        let model = self.model_collection(id)?.get(index)?.clone();
        let copy = self.duplicate_model(&model)?;
        self.add_model(id, Some(&copy))
    }

    pub fn model_collection_as_dict(&self, id: &CollectionId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.model_collection_record(id)?)?)
    }

    pub fn model_collection_from_dict(&mut self, value: &Value) -> ReflResult<CollectionId> {
        let record: ModelCollectionRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_model_collection(&record),
            |importer| importer.import_model_collection(&record),
        )
    }

    /// Renames either kind of standalone collection.
    pub fn rename_collection(&mut self, id: &CollectionId, name: &str) -> ReflResult<()> {
        if let Some(collection) = self.material_collections.get_mut(id) {
            collection.set_name(name);
            return Ok(());
        }
        self.model_collection_mut(id)?.set_name(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::ReflErrorCategory;
    use crate::session::Session;

    fn names(session: &Session, id: &crate::domain::CollectionId) -> Vec<String> {
        session
            .material_collection(id)
            .unwrap()
            .iter()
            .map(|material| session.material(material).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn default_material_collection_seeds_three_materials() {
        let mut session = Session::new();
        let id = session.create_default_material_collection().unwrap();
        assert_eq!(names(&session, &id), ["Air", "D2O", "Si"]);
        assert!(session.material_collection(&id).unwrap().populate_if_none());
        let si = session.material_collection(&id).unwrap().get(2).unwrap().clone();
        assert_eq!(session.complex_sld(&si).unwrap().re, 2.07);
    }

    #[test]
    fn explicit_material_lists_are_never_seeded() {
        let mut session = Session::new();
        let empty = session.create_material_collection("empty", &[]).unwrap();
        assert!(session.material_collection(&empty).unwrap().is_empty());

        let gold = session.create_material("Au", 4.66, -0.016).unwrap();
        let given = session.build_material_collection("given", &[gold], true).unwrap();
        assert_eq!(names(&session, &given), ["Au"]);
        assert_eq!(session.material_ids().count(), 1);

        let models = session.create_default_model_collection().unwrap();
        assert!(session.model_collection(&models).unwrap().populate_if_none());
        let none = session.create_model_collection("none", &[]).unwrap();
        assert!(session.model_collection(&none).unwrap().is_empty());
    }

    #[test]
    fn collection_moves_follow_index_semantics() {
        let mut session = Session::new();
        let id = session.create_default_material_collection().unwrap();
        let error = session.move_material_up(&id, 3).unwrap_err();
        assert_eq!(error.category(), ReflErrorCategory::Lookup);
        session.move_material_up(&id, 2).unwrap();
        session.move_material_up(&id, 1).unwrap();
        session.move_material_up(&id, 0).unwrap();
        assert_eq!(names(&session, &id), ["Si", "Air", "D2O"]);
        session.move_material_down(&id, 2).unwrap();
        session.move_material_down(&id, 0).unwrap();
        assert_eq!(names(&session, &id), ["Air", "Si", "D2O"]);
    }

    #[test]
    fn removal_keeps_materials_still_in_use() {
        let mut session = Session::new();
        let id = session.create_default_material_collection().unwrap();
        let air = session.material_collection(&id).unwrap().get(0).unwrap().clone();
        session.create_layer("air", &air, 0.0, 0.0).unwrap();
        session.remove_material(&id, 0).unwrap();
        assert!(session.material(&air).is_ok());

        let d2o = session.remove_material(&id, 0).unwrap();
        assert!(session.material(&d2o).is_err());
        assert_eq!(session.material_collection(&id).unwrap().len(), 1);
    }

    #[test]
    fn add_and_duplicate_materials() {
        let mut session = Session::new();
        let id = session.create_material_collection("mine", &[]).unwrap();
        let default = session.add_material(&id, None).unwrap();
        assert_eq!(session.material(&default).unwrap().name(), "EasyMaterial");
        let copy = session.duplicate_collection_material(&id, 0).unwrap();
        assert_eq!(names(&session, &id), ["EasyMaterial", "EasyMaterial duplicate"]);
        assert_ne!(copy, default);
    }

    #[test]
    fn model_collections_manage_models() {
        let mut session = Session::new();
        let id = session.create_default_model_collection().unwrap();
        assert_eq!(session.model_collection(&id).unwrap().len(), 1);
        let added = session.add_model(&id, None).unwrap();
        let copy = session.duplicate_collection_model(&id, 1).unwrap();
        assert_eq!(session.model(&copy).unwrap().name(), "EasyModel duplicate");

        session.move_model_up(&id, 2).unwrap();
        assert_eq!(session.model_collection(&id).unwrap().get(1).unwrap(), &copy);

        let removed = session.remove_model(&id, 2).unwrap();
        assert_eq!(removed, added);
        assert!(session.model(&added).is_err());
    }
}
