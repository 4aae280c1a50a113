/// Get indices for each group, where `group_ids[i]` is the group of item `i` and groups are
/// numbered `0..n_groups`.
pub fn get_group_indices(group_ids: &[usize], n_groups: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_groups];
    for (i, &g) in group_ids.iter().enumerate() {
        groups[g].push(i);
    }
    groups
}

/// Indices in `0..n` that are not in the ascending slice `group`.
pub fn complement_indices(group: &[usize], n: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(n.saturating_sub(group.len()));
    let mut it = group.iter().peekable();
    for i in 0..n {
        if it.peek() == Some(&&i) {
            it.next();
        } else {
            out.push(i);
        }
    }
    out
}
