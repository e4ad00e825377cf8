use refl_core::{AssemblyId, AssemblyShape, LayerId, ReflErrorCategory, SampleId, Session};

fn layers(session: &Session, assembly: &AssemblyId) -> Vec<LayerId> {
    session.assembly(assembly).unwrap().layers().items().to_vec()
}

fn thickness_enabled(session: &Session, layer: &LayerId) -> bool {
    let thickness = session.layer(layer).unwrap().thickness();
    session.parameter(thickness).unwrap().enabled()
}

fn roughness_enabled(session: &Session, layer: &LayerId) -> bool {
    let roughness = session.layer(layer).unwrap().roughness();
    session.parameter(roughness).unwrap().enabled()
}

fn assemblies(session: &Session, sample: &SampleId) -> Vec<AssemblyId> {
    session.sample(sample).unwrap().assemblies().items().to_vec()
}

#[test]
fn duplicating_the_front_assembly_yields_fully_enabled_copies() {
    let mut session = Session::new();
    let sample = session.create_default_sample().unwrap();
    let front = assemblies(&session, &sample)[0].clone();
    let old_subphase = session.subphase(&sample).unwrap().unwrap().clone();

    let copy = session.sample_duplicate_assembly(&sample, 0).unwrap();
    let copied = layers(&session, &copy);

    // The copy of the superphase is an ordinary layer again.
    assert!(roughness_enabled(&session, &copied[0]));
    assert!(thickness_enabled(&session, &copied[0]));
    assert!(!thickness_enabled(&session, &copied[1]));
    assert_eq!(session.subphase(&sample).unwrap(), Some(&copied[1]));
    assert!(thickness_enabled(&session, &old_subphase));

    let superphase = &layers(&session, &front)[0];
    assert!(!thickness_enabled(&session, superphase));
    assert!(!roughness_enabled(&session, superphase));
}

#[test]
fn reordering_assemblies_moves_both_ends() {
    let mut session = Session::new();
    let sample = session.create_default_sample().unwrap();
    let [first, second] = <[AssemblyId; 2]>::try_from(assemblies(&session, &sample)).unwrap();

    session.sample_move_assembly_up(&sample, 1).unwrap();
    assert_eq!(assemblies(&session, &sample), vec![second.clone(), first.clone()]);
    assert_eq!(session.superphase(&sample).unwrap(), Some(&layers(&session, &second)[0]));
    assert_eq!(session.subphase(&sample).unwrap(), Some(&layers(&session, &first)[1]));

    assert!(thickness_enabled(&session, &layers(&session, &first)[0]));
    assert!(roughness_enabled(&session, &layers(&session, &first)[0]));
    assert!(thickness_enabled(&session, &layers(&session, &second)[1]));

    session.sample_move_assembly_down(&sample, 0).unwrap();
    assert_eq!(assemblies(&session, &sample), vec![first, second]);
}

#[test]
fn moving_a_layer_inside_the_front_assembly_changes_the_superphase() {
    let mut session = Session::new();
    let sample = session.create_default_sample().unwrap();
    let front = assemblies(&session, &sample)[0].clone();
    let [top, inner] = <[LayerId; 2]>::try_from(layers(&session, &front)).unwrap();

    session.move_layer_down(&front, 0).unwrap();
    assert_eq!(session.superphase(&sample).unwrap(), Some(&inner));
    assert!(!roughness_enabled(&session, &inner));
    assert!(roughness_enabled(&session, &top));

    let error = session.set_layer_roughness(&inner, 4.0).unwrap_err();
    assert_eq!(error.category(), ReflErrorCategory::Immutability);
    session.set_layer_roughness(&top, 4.0).unwrap();
}

#[test]
fn editing_one_sample_keeps_the_boundary_of_another() {
    let mut session = Session::new();
    let left = session.create_default_multilayer().unwrap();
    let shared = session.create_default_multilayer().unwrap();
    let right = session.create_default_multilayer().unwrap();
    let first = session
        .create_sample("first", &[left.clone(), shared.clone()])
        .unwrap();
    let second = session
        .create_sample("second", &[shared.clone(), right])
        .unwrap();

    let shared_layers = layers(&session, &shared);
    assert_eq!(session.subphase(&first).unwrap(), Some(&shared_layers[1]));
    assert_eq!(session.superphase(&second).unwrap(), Some(&shared_layers[0]));

    session.sample_remove_assembly(&first, 1).unwrap();
    assert!(session.assembly(&shared).is_ok(), "still held by the second sample");
    assert_eq!(session.subphase(&first).unwrap(), Some(&layers(&session, &left)[1]));
    assert!(thickness_enabled(&session, &shared_layers[1]));
    assert!(!thickness_enabled(&session, &shared_layers[0]));
    assert!(!roughness_enabled(&session, &shared_layers[0]));
}

#[test]
fn emptied_samples_have_no_boundary() {
    let mut session = Session::new();
    let sample = session.create_default_sample().unwrap();
    let front = assemblies(&session, &sample)[0].clone();
    let front_layers = layers(&session, &front);

    session.sample_remove_assembly(&sample, 1).unwrap();
    assert_eq!(session.superphase(&sample).unwrap(), Some(&front_layers[0]));
    assert_eq!(session.subphase(&sample).unwrap(), Some(&front_layers[1]));

    session.sample_remove_assembly(&sample, 0).unwrap();
    assert_eq!(session.superphase(&sample).unwrap(), None);
    assert_eq!(session.subphase(&sample).unwrap(), None);
    assert!(session.assembly(&front).is_err());
}
