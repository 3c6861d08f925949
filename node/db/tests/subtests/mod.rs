// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use grove_db::Store;

pub fn write<DB>(db: &DB)
where
    DB: Store,
{
    let key = [1];
    let value = [1];
    db.write(key, value).unwrap();
}

pub fn read<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    let res = db.read(key).unwrap().unwrap();
    assert_eq!(value.as_ref(), res.as_slice());
}

pub fn exists<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    let res = db.exists(key).unwrap();
    assert!(res);
}

pub fn does_not_exist<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let res = db.exists(key).unwrap();
    assert!(!res);
}

pub fn delete<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    db.delete(key).unwrap();
    assert!(!db.exists(key).unwrap());
    // Deleting an absent key is not an error.
    db.delete(key).unwrap();
}

pub fn idempotent_write<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [7, 7];
    db.write(key, value).unwrap();
    db.write(key, value).unwrap();
    assert_eq!(db.read(key).unwrap().unwrap(), value.to_vec());
}

pub fn bulk_write<DB>(db: &DB)
where
    DB: Store,
{
    let keys = [[0], [1], [2]];
    let values = [[0], [1], [2]];
    db.bulk_write(&keys, &values).unwrap();
    for k in keys.iter() {
        let res = db.exists(*k).unwrap();
        assert!(res);
    }
}

pub fn bulk_write_length_mismatch<DB>(db: &DB)
where
    DB: Store,
{
    let keys = [[0], [1]];
    let values = [[0]];
    assert!(db.bulk_write(&keys, &values).is_err());
}

pub fn bulk_delete<DB>(db: &DB)
where
    DB: Store,
{
    let keys = [[0], [1], [2]];
    let values = [[0], [1], [2]];
    db.bulk_write(&keys, &values).unwrap();
    db.bulk_delete(&keys).unwrap();
    for k in keys.iter() {
        assert!(!db.exists(*k).unwrap());
    }
}
