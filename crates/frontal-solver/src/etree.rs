//! Elimination tree construction and postordering.
//!
//! The elimination tree of a symmetric pattern links each column to the
//! column of its first below-diagonal factor entry; it is the structural
//! dependency skeleton the frontal tree is coarsened from.

/// Sentinel parent index for tree roots.
pub(crate) const NONE: usize = usize::MAX;

/// Elimination tree of a symmetric pattern, by Liu's ancestor-compression
/// algorithm. `parent[v] == NONE` marks a root; the pattern is given in
/// compressed-column form and only below-diagonal entries are inspected.
pub(crate) fn elimination_tree(n: usize, col_ptr: &[usize], row_idx: &[usize]) -> Vec<usize> {
    let mut parent = vec![NONE; n];
    let mut ancestor = vec![NONE; n];
    for k in 0..n {
        for &i in &row_idx[col_ptr[k]..col_ptr[k + 1]] {
            if i >= k {
                continue;
            }
            // Walk from i to its current root, compressing the path to k.
            let mut r = i;
            loop {
                let next = ancestor[r];
                ancestor[r] = k;
                if next == NONE {
                    if r != k {
                        parent[r] = k;
                    }
                    break;
                }
                if next == k {
                    break;
                }
                r = next;
            }
        }
    }
    parent
}

/// Depth-first postorder of a forest given by parent links.
///
/// Returns `post` with `post[k]` = the node placed at postorder position
/// `k`. Children and roots are visited in increasing index order, so the
/// result is deterministic.
pub(crate) fn postorder(parent: &[usize]) -> Vec<usize> {
    let n = parent.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for v in 0..n {
        if parent[v] == NONE {
            roots.push(v);
        } else {
            children[parent[v]].push(v);
        }
    }

    let mut post = Vec::with_capacity(n);
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for &root in &roots {
        stack.push((root, 0));
        while let Some(top) = stack.last_mut() {
            let (v, cursor) = *top;
            if cursor < children[v].len() {
                top.1 += 1;
                stack.push((children[v][cursor], 0));
            } else {
                post.push(v);
                stack.pop();
            }
        }
    }
    post
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tridiagonal_gives_a_chain() {
        // Symmetric tridiagonal pattern on 4 nodes.
        let col_ptr = vec![0, 1, 3, 5, 6];
        let row_idx = vec![1, 0, 2, 1, 3, 2];
        let parent = elimination_tree(4, &col_ptr, &row_idx);
        assert_eq!(parent, vec![1, 2, 3, NONE]);
    }

    #[test]
    fn diagonal_gives_a_forest() {
        let parent = elimination_tree(3, &[0, 0, 0, 0], &[]);
        assert_eq!(parent, vec![NONE, NONE, NONE]);
    }

    #[test]
    fn arrow_pattern_roots_at_last_column() {
        // Arrow matrix: every column coupled to the last one.
        // Below-diagonal entries: (3,0), (3,1), (3,2).
        let col_ptr = vec![0, 1, 2, 3, 6];
        let row_idx = vec![3, 3, 3, 0, 1, 2];
        let parent = elimination_tree(4, &col_ptr, &row_idx);
        assert_eq!(parent, vec![3, 3, 3, NONE]);
    }

    #[test]
    fn postorder_places_children_before_parents() {
        // Forest: 0 -> 2, 1 -> 2, 2 root; 3 root.
        let parent = vec![2, 2, NONE, NONE];
        let post = postorder(&parent);
        assert_eq!(post, vec![0, 1, 2, 3]);

        let pos: Vec<usize> = {
            let mut pos = vec![0; 4];
            for (k, &v) in post.iter().enumerate() {
                pos[v] = k;
            }
            pos
        };
        for v in 0..4 {
            if parent[v] != NONE {
                assert!(pos[v] < pos[parent[v]]);
            }
        }
    }

    #[test]
    fn postorder_of_chain_is_identity() {
        let parent = vec![1, 2, 3, NONE];
        assert_eq!(postorder(&parent), vec![0, 1, 2, 3]);
    }
}
