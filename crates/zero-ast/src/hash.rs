//! Small hash-combination helper shared by the aggregate `Type`/`Expression`
//! variants, which all XOR-fold their children's hashes (the pattern used
//! throughout `AST.cpp`'s `GetHash` bodies).

pub fn combine_all(hashes: impl Iterator<Item = u64>) -> u64 {
    hashes.fold(0u64, |acc, h| acc ^ h)
}
