//! Normalization of provider response collections.
//!
//! The provider may omit a collection entirely, return it empty, or return a
//! single element where many are possible. Everything downstream sees a plain
//! sequence.

use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use aws_sdk_ec2::types::{Instance, Reservation};

/// Every instance of every reservation, in response order.
pub fn flatten_instances(output: &DescribeInstancesOutput) -> Vec<&Instance> {
    flatten(output.reservations(), Reservation::instances)
}

/// Flattens a possibly empty collection of parents into their children.
pub fn flatten<'a, P, C, F>(parents: &'a [P], children: F) -> Vec<&'a C>
where
    F: Fn(&'a P) -> &'a [C],
{
    parents.iter().flat_map(children).collect()
}
