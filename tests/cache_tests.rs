use gridmap::layers::catalog::layer_for_product_code;
use gridmap::tiles::disk::DiskCache;
use gridmap::{CacheManager, CacheSettings, MapTile, TileCache};
use std::sync::Arc;

/// Two-tier cache behaviour across restarts and upgrades
#[cfg(test)]
mod cache_tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tile(x: i32, y: i32) -> MapTile {
        MapTile::new(x, y, layer_for_product_code("25K").unwrap())
    }

    #[test]
    fn test_get_after_put_and_barrier() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::open(CacheSettings::default().with_directory(dir.path()));
        assert!(cache.has_disk_tier());

        cache.put_async(tile(10, 20), Arc::new(b"tile bytes".to_vec()));
        cache.flush();
        assert_eq!(cache.get(&tile(10, 20)).unwrap().as_slice(), b"tile bytes");
        assert!(dir.path().join("25K_10_20.tile").exists());
    }

    #[test]
    fn test_new_generation_invalidates_disk_tier() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let v1 = CacheSettings::default().with_directory(dir.path()).with_app_version(1);
        {
            let cache = TileCache::open(v1.clone());
            cache.put_async(tile(1, 1), Arc::new(vec![1; 64]));
            cache.flush();
        }

        // same build: the tile survives a restart
        assert!(TileCache::open(v1.clone()).get(&tile(1, 1)).is_some());

        // upgraded build: everything from the old catalog is gone
        let v2 = TileCache::open(v1.with_app_version(2));
        assert!(v2.get(&tile(1, 1)).is_none());
    }

    #[test]
    fn test_disk_budget_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::open(
            CacheSettings::default()
                .with_directory(dir.path())
                .with_disk_budget(300),
        );
        for x in 0..5 {
            cache.put_async(tile(x, 0), Arc::new(vec![0; 100]));
        }
        cache.flush();
        drop(cache);

        let disk = DiskCache::open(dir.path(), CacheSettings::default().app_version, 300).unwrap();
        assert_eq!(disk.len(), 3);
        assert!(disk.size_bytes() <= 300);
        assert!(!disk.contains("25K_0_0"));
        assert!(disk.contains("25K_4_0"));
    }

    #[test]
    fn test_unusable_directory_degrades_to_memory() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let cache = TileCache::open(CacheSettings::default().with_directory(&blocker));
        assert!(!cache.has_disk_tier());
        cache.put_async(tile(2, 2), Arc::new(vec![9]));
        assert_eq!(*cache.get(&tile(2, 2)).unwrap(), vec![9]);
    }

    #[test]
    fn test_manager_recreates_on_settings_change() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new();
        let settings = CacheSettings::for_memory_class(128).with_directory(dir.path());

        let first = manager.cache_for(&settings);
        first.put_async(tile(5, 5), Arc::new(vec![5]));
        assert!(Arc::ptr_eq(&first, &manager.cache_for(&settings)));

        // a bigger memory class replaces the instance but keeps the disk tier
        let second = manager.cache_for(&CacheSettings::for_memory_class(256).with_directory(dir.path()));
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*second.get(&tile(5, 5)).unwrap(), vec![5]);
        assert_eq!(second.stats().disk_hits, 1);
    }

    #[test]
    fn test_replaced_instance_cannot_outgrow_disk_budget() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new();
        let old = manager.cache_for(&CacheSettings::for_memory_class(128).with_directory(dir.path()));
        let new = manager.cache_for(&CacheSettings::for_memory_class(256).with_directory(dir.path()));
        assert!(!old.has_disk_tier());
        assert!(new.has_disk_tier());

        // a frame driver still holding the old instance keeps writing
        new.put_async(tile(2, 2), Arc::new(vec![2; 16]));
        old.put_async(tile(1, 1), Arc::new(vec![1; 16]));
        new.flush();
        old.flush();
        assert_eq!(*old.get(&tile(1, 1)).unwrap(), vec![1; 16]);
        drop((old, new, manager));

        let disk = DiskCache::open(dir.path(), CacheSettings::default().app_version, u64::MAX).unwrap();
        assert!(disk.contains("25K_2_2"));
        assert!(!dir.path().join("25K_1_1.tile").exists());

        // every tile file in the directory is accounted for
        let files = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().map_or(false, |x| x == "tile"))
            .count();
        assert_eq!(files, disk.len());
    }
}
