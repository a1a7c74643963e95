use mkatlas_core::config::PackerConfig;
use mkatlas_core::error::AtlasError;
use mkatlas_core::packer::maxrects::MaxRectsPacker;

#[test]
fn three_rects_share_one_bin() {
    let mut p = MaxRectsPacker::new(PackerConfig::new(64, 64, 0, false));
    let ids = [(40, 40), (40, 24), (24, 40)].map(|(w, h)| p.add(w, h).unwrap());
    p.pack().unwrap();

    assert_eq!(p.bin_count(), 1);
    let rects: Vec<_> = ids.iter().map(|id| p.placement(*id).footprint()).collect();
    for id in ids {
        assert_eq!(p.placement(id).bin, Some(0));
        assert!(!p.placement(id).flipped);
    }
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            assert!(!rects[i].intersects(&rects[j]), "{:?} overlaps {:?}", rects[i], rects[j]);
        }
    }
    assert_eq!((rects[0].x, rects[0].y), (0, 0));
}

#[test]
fn bin_limit_leaves_rest_unassigned() {
    let mut p = MaxRectsPacker::new(PackerConfig::new(10, 10, 1, true));
    let a = p.add(8, 8).unwrap();
    let b = p.add(8, 8).unwrap();
    let err = p.pack().unwrap_err();
    assert!(matches!(err, AtlasError::PackingExhausted { placed: 1, total: 2 }));
    assert_eq!(p.placement(a).bin, Some(0));
    assert_eq!(p.placement(b).bin, None);
    assert_eq!(p.bin_count(), 1);
}

#[test]
fn unlimited_bins_open_new_ones() {
    let mut p = MaxRectsPacker::new(PackerConfig::new(10, 10, 0, true));
    let a = p.add(8, 8).unwrap();
    let b = p.add(8, 8).unwrap();
    p.pack().unwrap();
    assert_eq!(p.bin_count(), 2);
    assert_eq!(p.placement(a).bin, Some(0));
    assert_eq!(p.placement(b).bin, Some(1));
    assert_eq!(p.pending_len(), 0);
}

#[test]
fn oversize_unless_rotation_makes_it_fit() {
    let mut p = MaxRectsPacker::new(PackerConfig::new(10, 10, 0, false));
    let err = p.add(20, 5).unwrap_err();
    assert!(matches!(
        err,
        AtlasError::Oversize {
            width: 20,
            height: 5,
            ..
        }
    ));

    let mut p = MaxRectsPacker::new(PackerConfig::new(10, 20, 0, true));
    let id = p.add(20, 5).unwrap();
    p.pack().unwrap();
    let pl = p.placement(id);
    assert!(pl.flipped);
    assert_eq!(pl.bin, Some(0));
    let fp = pl.footprint();
    assert_eq!((fp.w, fp.h), (5, 20));
}

#[test]
fn zero_area_requests_are_never_placed() {
    let mut p = MaxRectsPacker::new(PackerConfig::new(16, 16, 1, true));
    let empty = p.add(0, 7).unwrap();
    let full = p.add(16, 16).unwrap();
    p.pack().unwrap();
    assert_eq!(p.placement(empty).bin, None);
    assert_eq!(p.placement(full).bin, Some(0));
}

#[test]
fn repack_after_configure_starts_over() {
    let mut p = MaxRectsPacker::new(PackerConfig::new(32, 32, 0, true));
    p.add(30, 30).unwrap();
    p.pack().unwrap();
    p.configure(PackerConfig::new(8, 8, 0, true));
    assert_eq!(p.placements().len(), 0);
    let id = p.add(8, 8).unwrap();
    p.pack().unwrap();
    assert_eq!(p.bin_count(), 1);
    assert_eq!(p.placement(id).bin, Some(0));
}
