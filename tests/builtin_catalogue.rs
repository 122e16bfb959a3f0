use chat_template_fixup::{
    audit,
    catalogue::Catalogue,
    verify::{Corpus, Outcome},
    Registry, Resolver,
};

fn on_disk() -> Catalogue {
    Catalogue::load_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/catalogue")).unwrap()
}

#[test]
fn every_original_maps_to_its_replacement() {
    let registry = Registry::builtin().unwrap();
    let resolver = Resolver::new(registry);
    let catalogue = Catalogue::builtin().unwrap();

    assert_eq!(registry.len(), catalogue.len());
    for entry in &catalogue.entries {
        assert_eq!(resolver.normalize(&entry.original), &*entry.replacement, "{}", entry.name);
    }
}

#[test]
fn replacements_are_left_alone() {
    let registry = Registry::builtin().unwrap();
    let resolver = Resolver::new(registry);

    for (name, _, replacement) in registry.entries() {
        assert!(!registry.contains(replacement.as_bytes()), "{name}");
        assert_eq!(resolver.normalize_str(replacement), replacement);
    }
}

#[test]
fn one_byte_off_is_not_a_match() {
    let registry = Registry::builtin().unwrap();
    let resolver = Resolver::new(registry);

    for (name, original, _) in registry.entries() {
        let mut trimmed = original.to_vec();
        trimmed.pop();
        assert_eq!(resolver.normalize(&trimmed), &trimmed[..], "{name}");

        let mut padded = original.to_vec();
        padded.push(b'\n');
        assert_eq!(resolver.normalize(&padded), &padded[..], "{name}");

        let crlf: Vec<u8> = original
            .iter()
            .flat_map(|&b| if b == b'\n' { vec![b'\r', b'\n'] } else { vec![b] })
            .collect();
        if crlf != original {
            assert_eq!(resolver.normalize(&crlf), &crlf[..], "{name}");
        }
    }
}

#[test]
fn builtin_passes_audit() {
    let findings = audit::audit(Registry::builtin().unwrap());
    assert!(!audit::has_errors(&findings), "{findings:?}");
}

#[test]
fn embedded_catalogue_matches_directory() {
    let findings = audit::drift(&Catalogue::builtin().unwrap(), &on_disk());
    assert!(findings.is_empty(), "{findings:?}");
}

#[test]
fn directory_builds_a_registry() {
    let registry = on_disk().registry().unwrap();
    assert_eq!(registry.len(), Registry::builtin().unwrap().len());
}

#[test]
fn every_replacement_renders_like_its_original() {
    let corpus = Corpus::builtin().unwrap();
    let catalogue = Catalogue::builtin().unwrap();

    for entry in &catalogue.entries {
        let report = entry.verify(&corpus).unwrap();
        assert_eq!(report.results.len(), corpus.conversations.len(), "{}", entry.name);

        let unexpected = entry.unexpected_failures(&report);
        assert!(unexpected.is_empty(), "{}: {unexpected:?}", entry.name);
    }
}

#[test]
fn declared_divergences_name_real_conversations() {
    let corpus = Corpus::builtin().unwrap();
    let catalogue = Catalogue::builtin().unwrap();

    for entry in &catalogue.entries {
        let Some(divergence) = &entry.manifest.divergence else {
            continue;
        };
        assert!(!divergence.reason.is_empty(), "{}", entry.name);
        for name in &divergence.conversations {
            assert!(
                corpus.conversations.iter().any(|c| &c.name == name),
                "{}: no conversation `{name}` in the corpus",
                entry.name
            );
        }
    }
}

#[test]
fn undeclared_entries_are_fully_equivalent() {
    let corpus = Corpus::builtin().unwrap();
    let catalogue = Catalogue::builtin().unwrap();

    let undeclared: Vec<_> = catalogue
        .entries
        .iter()
        .filter(|e| e.manifest.divergence.is_none())
        .collect();
    assert!(undeclared.len() > catalogue.len() / 2);
    for entry in undeclared {
        let report = entry.verify(&corpus).unwrap();
        assert!(report.is_equivalent(), "{report:?}");
    }
}

#[test]
fn mistral_nemo_only_differs_with_a_system_prompt() {
    let corpus = Corpus::builtin().unwrap();
    let catalogue = Catalogue::builtin().unwrap();
    let entry = catalogue.get("mistral-nemo-instruct").unwrap();

    let report = entry.verify(&corpus).unwrap();
    let failed: Vec<_> = report.failures().map(|f| f.conversation.as_str()).collect();
    assert_eq!(failed, ["system prompt"]);
    assert!(matches!(report.failures().next().map(|f| &f.outcome), Some(Outcome::TargetFailed(_))));
}

#[test]
fn concurrent_callers_agree() {
    let catalogue = Catalogue::builtin().unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let catalogue = &catalogue;
                s.spawn(move || {
                    let resolver = Resolver::new(Registry::builtin().unwrap());
                    catalogue
                        .entries
                        .iter()
                        .cycle()
                        .skip(i)
                        .take(200)
                        .map(|e| resolver.normalize(&e.original).to_vec())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let results = handle.join().unwrap();
            for (result, entry) in results
                .iter()
                .zip(catalogue.entries.iter().cycle().skip(i))
            {
                assert_eq!(result[..], *entry.replacement);
            }
        }
    });
}
